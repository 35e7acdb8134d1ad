// ── Command batches ──
//
// An ordered list of prepared commands. Members are validated on insertion,
// so a batch never holds a document its schema would reject.

use crate::document::{ConfigDocument, PreparedCommand};
use crate::routing::Target;
use crate::schema::SchemaValidationError;

#[derive(Debug, Clone, Default)]
pub struct CommandBatch {
    commands: Vec<PreparedCommand>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append one document.
    pub fn push(&mut self, doc: &ConfigDocument, target: Target) -> Result<(), SchemaValidationError> {
        let cmd = doc.prepare(target)?;
        self.commands.push(cmd);
        Ok(())
    }

    /// Validate and append several documents. If any member fails, nothing
    /// is appended.
    pub fn extend<'a, I>(&mut self, docs: I) -> Result<(), SchemaValidationError>
    where
        I: IntoIterator<Item = (&'a ConfigDocument, Target)>,
    {
        let prepared = docs
            .into_iter()
            .map(|(doc, target)| doc.prepare(target))
            .collect::<Result<Vec<_>, _>>()?;
        self.commands.extend(prepared);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PreparedCommand> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a PreparedCommand;
    type IntoIter = std::slice::Iter<'a, PreparedCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for CommandBatch {
    type Item = PreparedCommand;
    type IntoIter = std::vec::IntoIter<PreparedCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::version::SempVersion;

    fn doc(path: &str, value: &str) -> ConfigDocument {
        let mut d = ConfigDocument::new(path, &SempVersion::default());
        d.set(path, value);
        d
    }

    #[test]
    fn push_keeps_order_and_routing() {
        let mut batch = CommandBatch::new();
        batch
            .push(&doc("create.message_vpn.vpn_name", "a"), Target::Both)
            .unwrap();
        batch
            .push(&doc("show.queue.name", "q"), Target::PrimaryOnly)
            .unwrap();

        let targets: Vec<Target> = batch.iter().map(PreparedCommand::target).collect();
        assert_eq!(targets, vec![Target::Both, Target::PrimaryOnly]);
    }

    #[test]
    fn invalid_member_leaves_batch_unchanged() {
        let mut batch = CommandBatch::new();
        batch
            .push(&doc("create.message_vpn.vpn_name", "a"), Target::Both)
            .unwrap();

        let good = doc("create.message_vpn.vpn_name", "b");
        let bad = doc("create.hyperdrive.name", "c");
        let err = batch.extend([(&good, Target::Both), (&bad, Target::Both)]);

        assert!(err.is_err());
        assert_eq!(batch.len(), 1);
    }
}
