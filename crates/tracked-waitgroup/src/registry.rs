use std::collections::HashMap;

use crate::snapshot::SiteSnapshot;
use crate::Site;

/// Outstanding count per registration site.
///
/// Entries are strictly positive; an entry is removed as soon as its last
/// unit resolves. Locking is the owner's job.
#[derive(Debug, Default)]
pub(crate) struct SiteRegistry {
    by_site: HashMap<Site, usize>,
}

/// What happened to the registry on a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The site still has this many units outstanding.
    Remaining(usize),
    /// The site's last unit resolved and its entry was removed.
    Cleared,
    /// The site had no entry; nothing changed.
    Unknown,
}

impl SiteRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, site: &Site, n: usize) {
        if n == 0 {
            return;
        }
        *self.by_site.entry(site.clone()).or_insert(0) += n;
    }

    pub(crate) fn resolve(&mut self, site: &Site) -> Resolution {
        let Some(outstanding) = self.by_site.get_mut(site) else {
            return Resolution::Unknown;
        };
        *outstanding -= 1;
        if *outstanding == 0 {
            self.by_site.remove(site);
            Resolution::Cleared
        } else {
            Resolution::Remaining(*outstanding)
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_site.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self, site: &Site) -> Option<usize> {
        self.by_site.get(site).copied()
    }

    /// Entries sorted by site so repeated dumps read the same way.
    pub(crate) fn sites(&self) -> Vec<SiteSnapshot> {
        let mut sites: Vec<SiteSnapshot> = self
            .by_site
            .iter()
            .map(|(site, &outstanding)| SiteSnapshot {
                site: site.to_string(),
                outstanding: outstanding as u64,
            })
            .collect();
        sites.sort_by(|a, b| a.site.cmp(&b.site));
        sites
    }
}
