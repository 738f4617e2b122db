use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TallyError};
use crate::migration::{MigrationId, MigrationSource, MigrationUnit};

/// An action invoked on a [`ScriptedUnit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCall {
    Apply(MigrationId),
    Revert(MigrationId),
}

#[derive(Debug, Clone, Default)]
struct Script {
    apply_error: Option<String>,
    revert_error: Option<String>,
}

/// Migration source held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    units: Arc<Mutex<BTreeMap<MigrationId, Script>>>,
    calls: Arc<Mutex<Vec<UnitCall>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit whose actions succeed.
    pub fn with_unit(self, id: &str) -> Self {
        self.insert(id, Script::default());
        self
    }

    /// Add a unit whose `apply` fails with `message`.
    pub fn with_failing_apply(self, id: &str, message: &str) -> Self {
        self.insert(
            id,
            Script {
                apply_error: Some(message.to_string()),
                revert_error: None,
            },
        );
        self
    }

    /// Add a unit whose `revert` fails with `message`.
    pub fn with_failing_revert(self, id: &str, message: &str) -> Self {
        self.insert(
            id,
            Script {
                apply_error: None,
                revert_error: Some(message.to_string()),
            },
        );
        self
    }

    fn insert(&self, id: &str, script: Script) {
        self.units
            .lock()
            .unwrap()
            .insert(MigrationId::new(id), script);
    }

    /// Every action invoked so far, in order.
    pub fn calls(&self) -> Vec<UnitCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied(&self, id: &str) -> usize {
        let id = MigrationId::new(id);
        self.calls()
            .iter()
            .filter(|c| **c == UnitCall::Apply(id.clone()))
            .count()
    }

    pub fn reverted(&self, id: &str) -> usize {
        let id = MigrationId::new(id);
        self.calls()
            .iter()
            .filter(|c| **c == UnitCall::Revert(id.clone()))
            .count()
    }
}

impl MigrationSource for InMemorySource {
    type Unit = ScriptedUnit;

    fn list_available(&self) -> Result<Vec<MigrationId>> {
        Ok(self.units.lock().unwrap().keys().cloned().collect())
    }

    fn exists(&self, id: &MigrationId) -> bool {
        self.units.lock().unwrap().contains_key(id)
    }

    fn resolve(&self, id: &MigrationId) -> Result<ScriptedUnit> {
        let script = self
            .units
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| TallyError::UnitNotFound(id.clone()))?;

        Ok(ScriptedUnit {
            id: id.clone(),
            script,
            calls: Arc::clone(&self.calls),
        })
    }

    fn delete_unit(&self, id: &MigrationId) -> Result<bool> {
        Ok(self.units.lock().unwrap().remove(id).is_some())
    }
}

/// Unit produced by [`InMemorySource`]; records each invocation.
#[derive(Debug, Clone)]
pub struct ScriptedUnit {
    id: MigrationId,
    script: Script,
    calls: Arc<Mutex<Vec<UnitCall>>>,
}

impl ScriptedUnit {
    fn run(&self, call: UnitCall, error: &Option<String>) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match error {
            Some(message) => Err(TallyError::Database(message.clone())),
            None => Ok(()),
        }
    }
}

impl MigrationUnit for ScriptedUnit {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    async fn apply(&self) -> Result<()> {
        self.run(UnitCall::Apply(self.id.clone()), &self.script.apply_error)
    }

    async fn revert(&self) -> Result<()> {
        self.run(UnitCall::Revert(self.id.clone()), &self.script.revert_error)
    }
}
