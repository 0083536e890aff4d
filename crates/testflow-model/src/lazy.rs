//! Lazily assembled models.
//!
//! A [`LazyModel`] holds registration descriptors for model types and builds
//! a type only when a query could need it. Each type is built at most once
//! per `LazyModel`, no matter how many queries or dependents ask for it.
//!
//! Model types declare their dependencies on other model types explicitly
//! through [`ModelType::dependencies`]; a type can only be registered after
//! everything it depends on.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use indexmap::IndexMap;

use testflow_core::Flow;

use crate::eager::EagerModel;
use crate::error::ModelError;
use crate::listener::ModelListener;
use crate::model::{extend_unique, Model};
use crate::tags::{TagFilter, TagSummary};

/// A model type that a [`LazyModel`] can build on demand.
///
/// Title, tags and dependencies are associated functions so they are
/// available before any instance exists.
pub trait ModelType: Send + Sync + Sized + 'static {
    fn title() -> &'static str;

    /// What the flows of every instance may and always will carry.
    fn tags() -> TagSummary;

    /// Model types whose instances [`construct`](Self::construct) reads.
    fn dependencies() -> Vec<ModelKey> {
        Vec::new()
    }

    /// Builds and populates an instance. Dependencies are already built and
    /// available through `deps`.
    fn construct(deps: &Deps) -> Result<Self, ModelError>;

    fn model(&self) -> &EagerModel;
}

/// Identity of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelKey {
    type_id: TypeId,
    name: &'static str,
}

impl ModelKey {
    pub fn of<T: ModelType>() -> Self {
        ModelKey {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A built model type instance, kept both typed and as a `dyn Model`.
#[derive(Clone)]
struct Instance {
    typed: Arc<dyn Any + Send + Sync>,
    model: Arc<dyn Model>,
}

/// Adapts a model type to the `Model` trait through its inner `EagerModel`.
struct Typed<T>(Arc<T>);

impl<T: ModelType> Model for Typed<T> {
    fn title(&self) -> &str {
        self.0.model().title()
    }

    fn tags(&self) -> &TagSummary {
        self.0.model().tags()
    }

    fn flows(&self, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError> {
        self.0.model().flows(filter)
    }

    fn subs(&self) -> Vec<Arc<dyn Model>> {
        self.0.model().subs()
    }
}

type Construct = Arc<dyn Fn(&Deps) -> Result<Instance, ModelError> + Send + Sync>;

/// Everything a [`LazyModel`] needs to know about a model type, captured
/// once at registration.
#[derive(Clone)]
pub struct ModelDescriptor {
    key: ModelKey,
    title: &'static str,
    tags: TagSummary,
    dependencies: Vec<ModelKey>,
    construct: Construct,
}

impl ModelDescriptor {
    pub fn of<T: ModelType>() -> Self {
        let construct: Construct = Arc::new(|deps: &Deps| {
            let typed = Arc::new(T::construct(deps)?);
            Ok(Instance {
                model: Arc::new(Typed(Arc::clone(&typed))),
                typed,
            })
        });
        ModelDescriptor {
            key: ModelKey::of::<T>(),
            title: T::title(),
            tags: T::tags(),
            dependencies: T::dependencies(),
            construct,
        }
    }

    pub fn key(&self) -> ModelKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn tags(&self) -> &TagSummary {
        &self.tags
    }

    pub fn dependencies(&self) -> &[ModelKey] {
        &self.dependencies
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Built dependencies handed to [`ModelType::construct`].
pub struct Deps {
    owner: &'static str,
    built: HashMap<ModelKey, Instance>,
}

impl Deps {
    /// The built instance of dependency `T`.
    pub fn get<T: ModelType>(&self) -> Result<Arc<T>, ModelError> {
        let missing = || ModelError::MissingDependency {
            model: self.owner,
            dependency: type_name::<T>(),
        };
        let instance = self.built.get(&ModelKey::of::<T>()).ok_or_else(missing)?;
        Arc::clone(&instance.typed)
            .downcast::<T>()
            .map_err(|_| missing())
    }

    /// The built instance of dependency `T` as a submodel.
    pub fn model<T: ModelType>(&self) -> Result<Arc<dyn Model>, ModelError> {
        self.built
            .get(&ModelKey::of::<T>())
            .map(|i| Arc::clone(&i.model))
            .ok_or_else(|| ModelError::MissingDependency {
                model: self.owner,
                dependency: type_name::<T>(),
            })
    }
}

type Cell = Arc<Mutex<Option<Instance>>>;

/// A model that builds registered model types on demand.
pub struct LazyModel {
    title: String,
    descriptors: IndexMap<ModelKey, ModelDescriptor>,
    tags: TagSummary,
    cells: DashMap<ModelKey, Cell>,
    listener: Option<Arc<dyn ModelListener>>,
}

impl LazyModel {
    pub fn new(title: impl Into<String>) -> Self {
        LazyModel {
            title: title.into(),
            descriptors: IndexMap::new(),
            tags: TagSummary::vacant(),
            cells: DashMap::new(),
            listener: None,
        }
    }

    /// Reports fresh builds, including builds of dependencies, to `listener`.
    pub fn with_listener(mut self, listener: Arc<dyn ModelListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn register<T: ModelType>(&mut self) -> Result<&mut Self, ModelError> {
        self.register_descriptor(ModelDescriptor::of::<T>())
    }

    /// Registers a descriptor. Its dependencies must already be registered.
    pub fn register_descriptor(
        &mut self,
        descriptor: ModelDescriptor,
    ) -> Result<&mut Self, ModelError> {
        if self.descriptors.contains_key(&descriptor.key) {
            return Err(ModelError::DuplicateRegistration {
                model: descriptor.name(),
            });
        }
        if let Some(dependency) = descriptor
            .dependencies
            .iter()
            .find(|d| !self.descriptors.contains_key(*d))
        {
            return Err(ModelError::UnregisteredDependency {
                model: descriptor.name(),
                dependency: dependency.name,
            });
        }
        tracing::debug!(model = descriptor.name(), "registered model type");
        self.descriptors.insert(descriptor.key, descriptor);
        self.tags = TagSummary::combine(self.descriptors.values().map(|d| &d.tags));
        Ok(self)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.descriptors.values()
    }

    /// The instance of `T`, building it and its dependencies if needed.
    pub fn get<T: ModelType>(&self) -> Result<Arc<T>, ModelError> {
        let instance = self.instantiate(ModelKey::of::<T>())?;
        instance
            .typed
            .downcast::<T>()
            .map_err(|_| ModelError::NotRegistered {
                model: type_name::<T>(),
            })
    }

    /// Whether `T` has been built.
    pub fn is_built<T: ModelType>(&self) -> bool {
        self.built(ModelKey::of::<T>()).is_some()
    }

    /// The memoized instance, if any. A cell poisoned by a panicking
    /// constructor still holds no instance, so it reads as unbuilt here while
    /// [`get`](Self::get) reports [`ModelError::Poisoned`].
    fn built(&self, key: ModelKey) -> Option<Instance> {
        let cell = self.cells.get(&key).map(|c| Arc::clone(c.value()))?;
        let guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    fn instantiate(&self, key: ModelKey) -> Result<Instance, ModelError> {
        let descriptor = self
            .descriptors
            .get(&key)
            .ok_or(ModelError::NotRegistered { model: key.name })?;
        // Clone the cell out so the map shard is not locked while building.
        let cell: Cell = Arc::clone(self.cells.entry(key).or_default().value());
        let mut slot = cell
            .lock()
            .map_err(|_| ModelError::Poisoned { model: key.name })?;
        if let Some(instance) = slot.as_ref() {
            tracing::trace!(model = key.name, "model cache hit");
            return Ok(instance.clone());
        }

        // Dependencies always register earlier, so locks are taken in
        // registration order and cannot deadlock.
        let mut built = HashMap::new();
        for dependency in &descriptor.dependencies {
            built.insert(*dependency, self.instantiate(*dependency)?);
        }
        let deps = Deps {
            owner: key.name,
            built,
        };

        if let Some(listener) = &self.listener {
            listener.started(descriptor);
        }
        let instance = (descriptor.construct)(&deps)?;
        if let Some(listener) = &self.listener {
            let model = instance.model.as_ref();
            let flows = model.flows(&TagFilter::all())?.len();
            listener.ended(model);
            listener.count(model, model.subs().len(), flows);
        }
        tracing::debug!(model = key.name, "built model type");
        *slot = Some(instance.clone());
        Ok(instance)
    }
}

impl Model for LazyModel {
    fn title(&self) -> &str {
        &self.title
    }

    /// Combined declared summaries of every registered type.
    fn tags(&self) -> &TagSummary {
        &self.tags
    }

    /// Builds, in registration order, every registered type whose declared
    /// summary admits `filter`, and collects their matching flows.
    fn flows(&self, filter: &TagFilter) -> Result<Vec<Arc<Flow>>, ModelError> {
        let mut flows = Vec::new();
        let mut seen = HashSet::new();
        for descriptor in self.descriptors.values() {
            if !descriptor.tags.compatible(filter) {
                continue;
            }
            let instance = self.instantiate(descriptor.key)?;
            extend_unique(&mut flows, &mut seen, instance.model.flows(filter)?);
        }
        Ok(flows)
    }

    fn subs(&self) -> Vec<Arc<dyn Model>> {
        self.descriptors
            .keys()
            .filter_map(|key| self.built(*key))
            .map(|instance| instance.model)
            .collect()
    }
}
