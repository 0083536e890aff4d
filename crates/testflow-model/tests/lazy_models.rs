//! Lazy assembly of model types, build-once guarantees, and tag summaries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use testflow_core::{Actor, Creator, Deriver, Flow, Text};
use testflow_model::{
    schedule, CombineModel, Deps, EagerModel, LazyModel, Model, ModelDescriptor, ModelError,
    ModelKey, ModelListener, ModelType, TagFilter, TagSummary,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn flow(description: &str, tags: &[&str]) -> Result<Arc<Flow>, ModelError> {
    let shop = Actor::new("SHOP");
    let flow = Creator::build(|f| {
        f.set_description(description)
            .set_tags(tags.iter().copied())
            .call(|c| {
                c.from(&shop)
                    .to(&shop)
                    .request(Text::new().with("text", description))
                    .response(Text::new())
            });
    })?;
    Ok(flow)
}

struct Cheese {
    model: EagerModel,
    supplied: Arc<Flow>,
}

impl ModelType for Cheese {
    fn title() -> &'static str {
        "cheese"
    }

    fn tags() -> TagSummary {
        TagSummary::new(
            ["cheese", "supply", "fulfilled", "rejected"],
            ["cheese", "supply"],
        )
    }

    fn construct(_: &Deps) -> Result<Self, ModelError> {
        let supplied = flow("supplied", &["cheese", "supply", "fulfilled"])?;
        let denied = Deriver::build(&supplied, |f| {
            f.set_description("denied")
                .remove_tags(["fulfilled"])
                .add_tags(["rejected"]);
        })?;
        let model = EagerModel::of::<Self>();
        model.populate([Arc::clone(&supplied), denied], [])?;
        Ok(Cheese { model, supplied })
    }

    fn model(&self) -> &EagerModel {
        &self.model
    }
}

struct Wine {
    model: EagerModel,
}

impl ModelType for Wine {
    fn title() -> &'static str {
        "wine"
    }

    fn tags() -> TagSummary {
        TagSummary::uniform(["wine"])
    }

    fn construct(_: &Deps) -> Result<Self, ModelError> {
        let model = EagerModel::of::<Self>();
        model.populate([flow("poured", &["wine"])?], [])?;
        Ok(Wine { model })
    }

    fn model(&self) -> &EagerModel {
        &self.model
    }
}

struct Platter {
    model: EagerModel,
}

impl ModelType for Platter {
    fn title() -> &'static str {
        "platter"
    }

    fn tags() -> TagSummary {
        TagSummary::uniform(["cheese", "platter"])
    }

    fn dependencies() -> Vec<ModelKey> {
        vec![ModelKey::of::<Cheese>()]
    }

    fn construct(deps: &Deps) -> Result<Self, ModelError> {
        let cheese = deps.get::<Cheese>()?;
        let served = Deriver::build(&cheese.supplied, |f| {
            f.set_description("served")
                .set_tags(["cheese", "platter"])
                .prerequisite(&cheese.supplied);
        })?;
        let model = EagerModel::of::<Self>();
        model.populate([served], [])?;
        Ok(Platter { model })
    }

    fn model(&self) -> &EagerModel {
        &self.model
    }
}

/// Reads a dependency it never declared.
struct Sneaky {
    model: EagerModel,
}

impl ModelType for Sneaky {
    fn title() -> &'static str {
        "sneaky"
    }

    fn tags() -> TagSummary {
        TagSummary::uniform(["sneaky"])
    }

    fn construct(deps: &Deps) -> Result<Self, ModelError> {
        deps.get::<Cheese>()?;
        Ok(Sneaky {
            model: EagerModel::of::<Self>(),
        })
    }

    fn model(&self) -> &EagerModel {
        &self.model
    }
}

#[derive(Default)]
struct Recorder {
    started: Mutex<Vec<&'static str>>,
    ended: AtomicUsize,
    counts: Mutex<Vec<(String, usize, usize)>>,
}

impl Recorder {
    fn started(&self) -> Vec<&'static str> {
        self.started.lock().unwrap().clone()
    }
}

impl ModelListener for Recorder {
    fn started(&self, descriptor: &ModelDescriptor) {
        self.started.lock().unwrap().push(descriptor.title());
    }

    fn ended(&self, _: &dyn Model) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self, model: &dyn Model, submodels: usize, flows: usize) {
        self.counts
            .lock()
            .unwrap()
            .push((model.title().to_string(), submodels, flows));
    }
}

fn registry(recorder: &Arc<Recorder>) -> LazyModel {
    let mut lazy = LazyModel::new("shop").with_listener(Arc::clone(recorder) as Arc<dyn ModelListener>);
    lazy.register::<Cheese>()
        .unwrap()
        .register::<Wine>()
        .unwrap()
        .register::<Platter>()
        .unwrap();
    lazy
}

fn descriptions(flows: &[Arc<Flow>]) -> Vec<String> {
    flows.iter().map(|f| f.description().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn only_compatible_types_are_built_and_only_once() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    assert!(lazy.subs().is_empty());

    let cheese = TagFilter::all().include(["cheese"]);
    let first = lazy.flows(&cheese).unwrap();
    assert_eq!(descriptions(&first), ["supplied", "denied", "served"]);
    assert_eq!(recorder.started(), ["cheese", "platter"]);
    assert!(!lazy.is_built::<Wine>());

    let again = lazy.flows(&cheese).unwrap();
    assert_eq!(descriptions(&again), descriptions(&first));
    assert_eq!(recorder.started(), ["cheese", "platter"]);
    assert_eq!(recorder.ended.load(Ordering::SeqCst), 2);

    lazy.flows(&TagFilter::all().include(["wine"])).unwrap();
    assert_eq!(recorder.started(), ["cheese", "platter", "wine"]);
    assert_eq!(lazy.subs().len(), 3);
}

#[test]
fn count_events_report_membership() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    lazy.get::<Cheese>().unwrap();
    assert_eq!(
        *recorder.counts.lock().unwrap(),
        [("cheese".to_string(), 0, 2)]
    );
}

#[test]
fn dependency_is_built_first_and_shared() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    let platter = lazy.get::<Platter>().unwrap();
    assert_eq!(recorder.started(), ["cheese", "platter"]);

    let cheese = lazy.get::<Cheese>().unwrap();
    let served = platter.model().flows(&TagFilter::all()).unwrap();
    assert!(Arc::ptr_eq(served[0].basis().unwrap(), &cheese.supplied));
    assert_eq!(recorder.started().len(), 2);
}

#[test]
fn concurrent_queries_build_each_type_once() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| lazy.flows(&TagFilter::all()).unwrap().len());
        }
    });
    let mut started = recorder.started();
    started.sort_unstable();
    assert_eq!(started, ["cheese", "platter", "wine"]);
}

#[test]
fn registration_requires_dependencies_first() {
    let mut lazy = LazyModel::new("shop");
    let err = lazy.register::<Platter>().err().unwrap();
    assert!(matches!(err, ModelError::UnregisteredDependency { .. }));

    lazy.register::<Cheese>().unwrap();
    let err = lazy.register::<Cheese>().err().unwrap();
    assert!(matches!(err, ModelError::DuplicateRegistration { .. }));
    assert!(lazy.register::<Platter>().is_ok());
}

#[test]
fn undeclared_dependency_is_rejected() {
    let mut lazy = LazyModel::new("shop");
    lazy.register::<Cheese>().unwrap().register::<Sneaky>().unwrap();
    let err = lazy.get::<Sneaky>().err().unwrap();
    assert!(matches!(err, ModelError::MissingDependency { .. }));
    assert!(matches!(
        lazy.get::<Wine>().err().unwrap(),
        ModelError::NotRegistered { .. }
    ));
}

struct Spoiled {
    model: EagerModel,
}

impl ModelType for Spoiled {
    fn title() -> &'static str {
        "spoiled"
    }

    fn tags() -> TagSummary {
        TagSummary::uniform(["spoiled"])
    }

    fn construct(_: &Deps) -> Result<Self, ModelError> {
        panic!("the milk turned");
    }

    fn model(&self) -> &EagerModel {
        &self.model
    }
}

#[test]
fn panicking_constructor_leaves_type_unbuilt() {
    let mut lazy = LazyModel::new("fridge");
    lazy.register::<Spoiled>().unwrap();
    let panicked =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| lazy.get::<Spoiled>())).is_err();
    assert!(panicked);

    assert!(!lazy.is_built::<Spoiled>());
    assert!(lazy.subs().is_empty());
    assert!(matches!(
        lazy.get::<Spoiled>().err().unwrap(),
        ModelError::Poisoned { model } if model.ends_with("Spoiled")
    ));
}

#[test]
fn schedule_puts_prerequisites_first() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    let order = schedule(&lazy, &TagFilter::all().include(["cheese"])).unwrap();
    let order = descriptions(&order);
    let position = |name: &str| order.iter().position(|d| d == name).unwrap();
    assert!(position("supplied") < position("served"));
    assert_eq!(order.len(), 3);
}

#[test]
fn lazy_summary_combines_declared_summaries() {
    let recorder = Arc::new(Recorder::default());
    let lazy = registry(&recorder);
    assert_eq!(lazy.tags().intersection().len(), 0);
    assert!(lazy.tags().union().contains("platter"));
    assert!(lazy.tags().union().contains("wine"));
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

const TAGS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn tag_sets() -> impl Strategy<Value = Vec<Vec<Vec<usize>>>> {
    // models -> flows -> tag indices
    prop::collection::vec(
        prop::collection::vec(prop::collection::vec(0..TAGS.len(), 0..4), 0..4),
        1..4,
    )
}

proptest! {
    #[test]
    fn combined_summary_matches_true_summary(models in tag_sets()) {
        let mut combined = CombineModel::new("all");
        for (m, flows) in models.iter().enumerate() {
            let built: Vec<Arc<Flow>> = flows
                .iter()
                .enumerate()
                .map(|(i, tags)| {
                    let tags: Vec<&str> = tags.iter().map(|&t| TAGS[t]).collect();
                    flow(&format!("m{m}-f{i}"), &tags).unwrap()
                })
                .collect();
            let declared = TagSummary::of_flows(built.iter().map(|f| f.as_ref()));
            let model = EagerModel::new(format!("m{m}"), declared);
            model.populate(built, []).unwrap();
            combined.add(Arc::new(model));
        }

        let all = combined.flows(&TagFilter::all()).unwrap();
        let truth = TagSummary::of_flows(all.iter().map(|f| f.as_ref()));
        prop_assert_eq!(combined.tags(), &truth);
    }
}
