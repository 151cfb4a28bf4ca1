use std::sync::{PoisonError, RwLock};

use ghostmap_core::{Entity, Ghost, Lifecycle, Registrable};

/// A named grouping of parties. Always fully loaded.
#[derive(Debug)]
pub struct PartyGroup {
    id: String,
    title: RwLock<String>,
    lifecycle: Lifecycle,
}

impl PartyGroup {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: RwLock::new(title.into()),
            lifecycle: Lifecycle::loaded(),
        }
    }

    pub fn title(&self) -> String {
        self.title
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn retitle(&self, title: impl Into<String>) {
        *self.title.write().unwrap_or_else(PoisonError::into_inner) = title.into();
    }
}

impl Entity for PartyGroup {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Registrable for PartyGroup {}

impl Ghost for PartyGroup {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}
