use facet::Facet;
use std::fmt;

/// Header written before the per-site lines of a dump.
pub const DUMP_HEADER: &str = "tracked wait group currently waiting on:";

/// Point-in-time view of a wait group's outstanding work.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct OutstandingSnapshot {
    /// Units registered but not yet completed, across all sites.
    pub pending: u64,
    /// Sites with a positive outstanding count, sorted by site.
    pub sites: Vec<SiteSnapshot>,
}

/// One registration site and its outstanding units.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct SiteSnapshot {
    pub site: String,
    pub outstanding: u64,
}

impl OutstandingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn outstanding_for(&self, site: &str) -> Option<u64> {
        self.sites
            .iter()
            .find(|entry| entry.site == site)
            .map(|entry| entry.outstanding)
    }

    pub fn to_json(&self) -> Result<String, String> {
        facet_json::to_string(self).map_err(|e| e.to_string())
    }
}

/// Renders the dump text. An empty snapshot renders as nothing at all.
impl fmt::Display for OutstandingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sites.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "{DUMP_HEADER}")?;
        for entry in &self.sites {
            writeln!(f, " {} ({} outstanding)", entry.site, entry.outstanding)?;
        }
        Ok(())
    }
}
