//! Props records - last-seen props per component element.

use std::collections::HashMap;

use crate::template::Props;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq)]
pub struct PropsRecord {
    /// Instance whose render produced these props
    pub owner: Address,
    pub current: Props,
    pub previous: Props,
}

#[derive(Debug, Default)]
pub struct PropsRecords {
    records: HashMap<Address, PropsRecord>,
}

impl PropsRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, site: &Address) -> Option<&Props> {
        self.records.get(site).map(|record| &record.current)
    }

    pub fn get(&self, site: &Address) -> Option<&PropsRecord> {
        self.records.get(site)
    }

    /// Record the props `owner` rendered for each site.
    ///
    /// Returns the sites whose props changed since the last record. Sites
    /// seen for the first time are not reported, and records of `owner` that
    /// no longer appear are dropped.
    pub fn update(&mut self, owner: &Address, sites: Vec<(Address, Props)>) -> Vec<Address> {
        let mut changed = Vec::new();
        let mut seen = Vec::with_capacity(sites.len());

        for (site, values) in sites {
            seen.push(site.clone());
            match self.records.get_mut(&site) {
                Some(record) => {
                    if values.changed_from(&record.current) {
                        record.previous = std::mem::replace(&mut record.current, values);
                        changed.push(site);
                    } else {
                        record.previous = record.current.clone();
                    }
                }
                None => {
                    self.records.insert(
                        site,
                        PropsRecord {
                            owner: owner.clone(),
                            current: values.clone(),
                            previous: values,
                        },
                    );
                }
            }
        }

        self.records
            .retain(|site, record| record.owner != *owner || seen.contains(site));
        changed
    }

    /// Drop the records produced by `owner`.
    pub fn remove_owned(&mut self, owner: &Address) {
        self.records.retain(|_, record| record.owner != *owner);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_unchanged_props_are_not_reported() {
        let owner = Address::new("hlx");
        let site = Address::new("hlx-0");
        let mut records = PropsRecords::new();

        assert!(records.update(&owner, vec![(site.clone(), props! { count: 0 })]).is_empty());
        assert!(records.update(&owner, vec![(site.clone(), props! { count: 0 })]).is_empty());

        let changed = records.update(&owner, vec![(site.clone(), props! { count: 1 })]);
        assert_eq!(changed, vec![site.clone()]);
        let record = records.get(&site).unwrap();
        assert_eq!(record.previous.text("count"), "0");
        assert_eq!(record.current.text("count"), "1");
    }

    #[test]
    fn test_vanished_sites_are_dropped() {
        let owner = Address::new("hlx");
        let mut records = PropsRecords::new();
        records.update(
            &owner,
            vec![
                (Address::new("hlx-0"), props! { a: 1 }),
                (Address::new("hlx-1"), props! { a: 2 }),
            ],
        );
        records.update(&Address::new("hlx-1"), vec![(Address::new("hlx-1-0"), props! {})]);
        records.update(&owner, vec![(Address::new("hlx-0"), props! { a: 1 })]);

        assert!(records.current(&Address::new("hlx-1")).is_none());
        assert!(records.current(&Address::new("hlx-1-0")).is_some());
        assert_eq!(records.len(), 2);

        records.remove_owned(&owner);
        assert_eq!(records.len(), 1);
    }
}
