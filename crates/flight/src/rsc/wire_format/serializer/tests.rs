#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::{Value, json};

    use super::super::*;
    use crate::rsc::modules::ModuleMap;
    use crate::rsc::thenable::Promise;
    use crate::rsc::types::{Element, Record, Renderable, ToModel};

    #[derive(Default)]
    struct RecordingDiagnostics {
        messages: RefCell<Vec<String>>,
    }

    impl Diagnostics for RecordingDiagnostics {
        fn warn(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    struct FakeContext {
        next_id: Cell<u32>,
        suspended: RefCell<Vec<(ChunkId, SegmentQuery)>>,
        errors: RefCell<Vec<(ChunkId, FlightError)>>,
        modules: ModuleMap,
        strict: bool,
        diagnostics: RecordingDiagnostics,
    }

    impl FakeContext {
        fn new() -> Self {
            let mut modules = ModuleMap::new();
            modules.register("Profile", "./Profile.client.js", "default");
            Self {
                next_id: Cell::new(1),
                suspended: RefCell::new(Vec::new()),
                errors: RefCell::new(Vec::new()),
                modules,
                strict: false,
                diagnostics: RecordingDiagnostics::default(),
            }
        }

        fn strict() -> Self {
            Self { strict: true, ..Self::new() }
        }

        fn allocate(&self) -> ChunkId {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            ChunkId::new(id)
        }
    }

    impl SerializationContext for FakeContext {
        fn suspend(&self, query: SegmentQuery, _thenable: Rc<dyn Thenable>) -> ChunkId {
            let id = self.allocate();
            self.suspended.borrow_mut().push((id, query));
            id
        }

        fn emit_error(&self, error: &FlightError) -> ChunkId {
            let id = self.allocate();
            self.errors.borrow_mut().push((id, error.clone()));
            id
        }

        fn resolve_module_meta_data(
            &self,
            reference: &ModuleReference,
        ) -> Result<Value, FlightError> {
            crate::rsc::modules::BundlerConfig::resolve_module_meta_data(&self.modules, reference)
        }

        fn strict_checks(&self) -> bool {
            self.strict
        }

        fn diagnostics(&self) -> &dyn Diagnostics {
            &self.diagnostics
        }
    }

    fn to_json(ctx: &FakeContext, model: &Model) -> Value {
        let text = ModelSerializer::new(ctx).serialize(model).expect("model should serialize");
        serde_json::from_str(&text).expect("serializer output should be valid JSON")
    }

    fn serialize_err(model: &Model) -> FlightError {
        let ctx = FakeContext::new();
        ModelSerializer::new(&ctx).serialize(model).expect_err("model should not serialize")
    }

    #[test]
    fn test_serialize_primitives() {
        let ctx = FakeContext::new();
        let serializer = ModelSerializer::new(&ctx);

        assert_eq!(serializer.serialize(&Model::Null).unwrap(), "null");
        assert_eq!(serializer.serialize(&Model::Bool(true)).unwrap(), "true");
        assert_eq!(serializer.serialize(&Model::from(42)).unwrap(), "42");
        assert_eq!(serializer.serialize(&Model::from(1.5)).unwrap(), "1.5");
        assert_eq!(serializer.serialize(&Model::from("hi")).unwrap(), r#""hi""#);
    }

    #[test]
    fn test_non_finite_numbers_become_null() {
        let ctx = FakeContext::new();
        let model = Model::array([
            Model::Number(f64::NAN),
            Model::Number(f64::INFINITY),
            Model::Number(f64::NEG_INFINITY),
        ]);

        assert_eq!(to_json(&ctx, &model), json!([null, null, null]));
    }

    #[test]
    fn test_large_integral_numbers_have_no_fraction() {
        let ctx = FakeContext::new();
        let serializer = ModelSerializer::new(&ctx);
        let model = Model::array([
            Model::Number(1e16),
            Model::Number(9_007_199_254_740_992.0),
            Model::Number(-2e15),
            Model::Number(1e19),
        ]);

        assert_eq!(
            serializer.serialize(&model).unwrap(),
            "[10000000000000000,9007199254740992,-2000000000000000,10000000000000000000]"
        );
    }

    #[test]
    fn test_dollar_and_at_strings_are_escaped() {
        let ctx = FakeContext::new();
        let model =
            Model::array([Model::from("$price"), Model::from("@home"), Model::from("plain")]);

        assert_eq!(to_json(&ctx, &model), json!(["$$price", "$@home", "plain"]));
    }

    #[test]
    fn test_undefined_handling() {
        let ctx = FakeContext::new();
        let serializer = ModelSerializer::new(&ctx);

        assert_eq!(serializer.serialize(&Model::Undefined).unwrap(), "null");

        let record = Record::new().with("a", 1).with("skip", Model::Undefined).with("b", 2);
        assert_eq!(serializer.serialize(&Model::from(record)).unwrap(), r#"{"a":1,"b":2}"#);

        let array = Model::array([Model::from(1), Model::Undefined]);
        assert_eq!(serializer.serialize(&array).unwrap(), "[1,null]");
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let ctx = FakeContext::new();
        let record = Record::new().with("zeta", 1).with("alpha", 2);

        assert_eq!(
            ModelSerializer::new(&ctx).serialize(&Model::from(record)).unwrap(),
            r#"{"zeta":1,"alpha":2}"#
        );
    }

    #[test]
    fn test_host_element_encoding() {
        let ctx = FakeContext::new();
        let element = Element::host("div").with_prop("className", "x").with_children("hi");

        assert_eq!(
            to_json(&ctx, &Model::from(element)),
            json!(["$", "div", null, {"className": "x", "children": "hi"}])
        );
    }

    #[test]
    fn test_components_resolve_inline() {
        let ctx = FakeContext::new();
        let greeting = Element::component("Greeting", |props| {
            let name = match props.get("name") {
                Some(Model::String(name)) => name.clone(),
                _ => String::new(),
            };
            Resolution::Ready(Model::from(Element::host("h1").with_children(format!("Hi {name}"))))
        })
        .with_prop("name", "Ada");
        let page = Element::host("main").with_children(greeting);

        assert_eq!(
            to_json(&ctx, &Model::from(page)),
            json!(["$", "main", null, {"children": ["$", "h1", null, {"children": "Hi Ada"}]}])
        );
        assert!(ctx.suspended.borrow().is_empty());
    }

    #[test]
    fn test_suspended_component_becomes_reference() {
        let ctx = FakeContext::new();
        let promise: Promise<Model> = Promise::new();
        let pending = Element::component("Slow", move |_| promise.read());
        let page = Element::host("main").with_children(pending);

        assert_eq!(
            to_json(&ctx, &Model::from(page)),
            json!(["$", "main", null, {"children": "$1"}])
        );

        let suspended = ctx.suspended.borrow();
        assert_eq!(suspended.len(), 1);
        assert_eq!(suspended[0].0, ChunkId::new(1));
        assert!(matches!(&suspended[0].1, SegmentQuery::Model(model) if model.is_element()));
    }

    #[test]
    fn test_component_failure_propagates() {
        let failing =
            Element::component("Broken", |_| Resolution::Failed(FlightError::component("boom")));
        let error = serialize_err(&Model::from(Element::host("div").with_children(failing)));

        assert_eq!(error.message(), "boom");
    }

    #[test]
    fn test_function_is_not_serializable() {
        let record =
            Record::new().with("title", "x").with("fn", Model::function("", |_| Model::Null));
        let error = serialize_err(&Model::from(record));

        assert_eq!(error.code(), "NOT_SERIALIZABLE");
        assert_eq!(
            error.message(),
            "Functions cannot be passed directly to client components because they're not \
             serializable. Remove fn (function) from this object, or avoid the entire object: \
             {title: \"x\", fn: function}"
        );
    }

    #[test]
    fn test_named_function_uses_its_name() {
        let record = Record::new().with("format", Model::function("formatDate", |_| Model::Null));
        let error = serialize_err(&Model::from(record));

        assert!(error.message().contains("Remove format (formatDate)"));
    }

    #[test]
    fn test_event_handler_message() {
        let props = Record::new().with("onClick", Model::function("handle", |_| Model::Null));
        let message = serialize_err(&Model::from(props)).message();

        assert!(message.starts_with("Event handlers cannot be passed to client component props."));
        assert!(message.contains("Remove onClick from these props if possible"));
        assert!(message.ends_with("consider converting part of this to a client component."));
    }

    #[test]
    fn test_lowercase_on_prefix_is_a_plain_function() {
        let props = Record::new().with("once", Model::function("", |_| Model::Null));
        assert!(serialize_err(&Model::from(props)).message().starts_with("Functions cannot"));
    }

    #[test]
    fn test_symbol_and_bigint_messages() {
        let error = serialize_err(&Model::array([Model::Symbol(Some("secret".to_string()))]));
        assert!(error.message().starts_with("Symbol values (secret) cannot be passed"));
        assert!(error.message().contains("Remove 0 from this object"));

        let error = serialize_err(&Model::from(Record::new().with("big", Model::BigInt(99))));
        assert!(error.message().starts_with("BigInt (99) is not yet supported"));
    }

    #[test]
    fn test_instance_messages() {
        let user = Model::instance("User", Record::new().with("id", 1));
        let error = serialize_err(&Model::from(Record::new().with("user", user)));
        let message = error.message();
        assert!(message.contains("Classes or other objects with methods are not supported"));
        assert!(message.ends_with("Remove user from these props: {user: {id: 1}}"));

        let date = Model::instance("Date", Record::new());
        let error = serialize_err(&Model::from(Record::new().with("at", date)));
        assert!(error.message().contains("Built-ins like Date are not supported"));
    }

    #[test]
    fn test_lazy_marker_is_unsupported() {
        let error = serialize_err(&Model::array([Model::Marker(Marker::Lazy)]));
        assert_eq!(error, FlightError::UnsupportedBlock);
    }

    #[test]
    fn test_unsupported_element_type_fails() {
        let error = serialize_err(&Model::from(Element::new(Renderable::Lazy)));
        assert_eq!(error.code(), "UNSUPPORTED_TYPE");
    }

    #[test]
    fn test_marker_values_use_reserved_strings() {
        let ctx = FakeContext::new();
        let model =
            Model::array([Model::Marker(Marker::Element), Model::Marker(Marker::ServerBlock)]);

        assert_eq!(to_json(&ctx, &model), json!(["$", "@"]));
    }

    #[test]
    fn test_server_block_with_ready_data() {
        let ctx = FakeContext::new();
        let block = ServerBlock::new(ModuleReference::new("Profile", "./Profile.client.js"), || {
            Resolution::Ready(Model::from(Record::new().with("user", "$ada")))
        });

        assert_eq!(
            to_json(&ctx, &Model::from(block)),
            json!([
                "@",
                {"id": "./Profile.client.js", "chunks": ["client1"], "name": "default"},
                {"user": "$$ada"}
            ])
        );
    }

    #[test]
    fn test_server_block_with_missing_module_emits_error_row() {
        let ctx = FakeContext::new();
        let block = ServerBlock::new(ModuleReference::new("Unknown", "./Unknown.js"), || {
            Resolution::Ready(Model::Null)
        });

        assert_eq!(to_json(&ctx, &Model::from(block)), json!(["@", "$1", null]));

        let errors = ctx.errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.code(), "MODULE_RESOLUTION");
    }

    #[test]
    fn test_server_block_with_pending_data_suspends_loader() {
        let ctx = FakeContext::new();
        let promise: Promise<Model> = Promise::new();
        let block =
            ServerBlock::new(ModuleReference::new("Profile", "./Profile.client.js"), move || {
                promise.read()
            });

        let json = to_json(&ctx, &Model::from(block));
        assert_eq!(json[2], json!("$1"));
        assert!(matches!(ctx.suspended.borrow()[0].1, SegmentQuery::Load(_)));
    }

    #[test]
    fn test_server_block_with_failed_data_emits_error_row() {
        let ctx = FakeContext::new();
        let block = ServerBlock::new(ModuleReference::new("Profile", "./Profile.client.js"), || {
            Resolution::Failed(FlightError::component("load failed"))
        });

        let json = to_json(&ctx, &Model::from(block));
        assert_eq!(json[2], json!("$1"));
        assert_eq!(ctx.errors.borrow()[0].1.message(), "load failed");
    }

    struct Timestamp(u32);

    impl ToModel for Timestamp {
        fn to_model(&self) -> Model {
            Model::from(format!("t{}", self.0))
        }

        fn type_name(&self) -> &str {
            "Timestamp"
        }
    }

    #[test]
    fn test_custom_values_serialize_through_to_model() {
        let ctx = FakeContext::new();
        let record = Record::new().with("at", Model::custom(Timestamp(5)));

        assert_eq!(to_json(&ctx, &Model::from(record)), json!({"at": "t5"}));
        assert!(ctx.diagnostics.messages.borrow().is_empty());
    }

    #[test]
    fn test_custom_values_warn_under_strict_checks() {
        let ctx = FakeContext::strict();
        let record = Record::new().with("at", Model::custom(Timestamp(5)));

        assert_eq!(to_json(&ctx, &Model::from(record)), json!({"at": "t5"}));

        let messages = ctx.diagnostics.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Objects with toJSON methods are not supported"));
        assert!(messages[0].contains("Remove at from these props: {at: Timestamp}"));
    }

    struct Rewrapping {
        calls: Rc<Cell<usize>>,
    }

    impl ToModel for Rewrapping {
        fn to_model(&self) -> Model {
            self.calls.set(self.calls.get() + 1);
            Model::custom(Rewrapping { calls: Rc::clone(&self.calls) })
        }

        fn type_name(&self) -> &str {
            "Rewrapping"
        }
    }

    #[test]
    fn test_custom_value_converting_to_custom_value_fails() {
        let calls = Rc::new(Cell::new(0));
        let record =
            Record::new().with("v", Model::custom(Rewrapping { calls: Rc::clone(&calls) }));

        let error = serialize_err(&Model::from(record));

        assert_eq!(calls.get(), 1);
        assert_eq!(error.code(), "NOT_SERIALIZABLE");
        assert!(error.message().contains("Rewrapping converted into another object"));
        assert!(error.message().ends_with("Remove v from these props: {v: Rewrapping}"));
    }
}
