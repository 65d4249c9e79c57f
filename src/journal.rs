//! Reflection journal grouped by topic for display.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::SolvedProblemHistoryEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct TopicGroup {
    pub topic: String,
    pub entries: Vec<SolvedProblemHistoryEntry>,
}

/// Topic name to entries. Topics keep first-appearance order and entries keep
/// input order; nothing is re-sorted, dropped or deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedJournal {
    groups: Vec<TopicGroup>,
    index: HashMap<String, usize>,
}

impl GroupedJournal {
    fn push(&mut self, entry: SolvedProblemHistoryEntry) {
        let slot = match self.index.get(&entry.topic_name) {
            Some(slot) => *slot,
            None => {
                self.groups.push(TopicGroup {
                    topic: entry.topic_name.clone(),
                    entries: Vec::new(),
                });
                let slot = self.groups.len() - 1;
                self.index.insert(entry.topic_name.clone(), slot);
                slot
            }
        };
        self.groups[slot].entries.push(entry);
    }

    /// Number of topics.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.topic.as_str())
    }

    pub fn get(&self, topic: &str) -> Option<&[SolvedProblemHistoryEntry]> {
        self.index
            .get(topic)
            .map(|slot| self.groups[*slot].entries.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicGroup> {
        self.groups.iter()
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.entries.len()).sum()
    }

    /// Entries in topic order, then within-topic order.
    pub fn flatten(&self) -> Vec<&SolvedProblemHistoryEntry> {
        self.groups
            .iter()
            .flat_map(|group| group.entries.iter())
            .collect()
    }
}

impl Serialize for GroupedJournal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.topic, &group.entries)?;
        }
        map.end()
    }
}

/// Groups journal entries by topic in a single pass.
pub fn group<I>(entries: I) -> GroupedJournal
where
    I: IntoIterator<Item = SolvedProblemHistoryEntry>,
{
    let mut journal = GroupedJournal::default();
    for entry in entries {
        journal.push(entry);
    }
    journal
}
