use std::collections::HashMap;

use serde::Deserialize;

/// One passthrough device request attached to an instance, e.g. `count: 1,
/// spec: [{"vendor_id": "8086", "product_id": "1520"}]`. Modeled after the
/// request shape `pci_passthrough_filter.py` hands to `PciDeviceStats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PciRequest {
    pub count: u32,
    pub spec: Vec<PciDeviceSpec>,
}

/// A single alternative a `PciRequest` will accept; `vendor_id`/`product_id`
/// are matched exactly when present, `None` matches any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct PciDeviceSpec {
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
}

/// Per-host PCI device inventory, grouped by `(vendor_id, product_id)`, as
/// reported in a compute node's `pci_stats` heartbeat field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PciDeviceStats {
    pools: HashMap<(String, String), u32>,
}

impl PciDeviceStats {
    pub fn from_pools(pools: HashMap<(String, String), u32>) -> Self {
        Self { pools }
    }

    fn matching_pools<'a>(
        &'a self,
        spec: &'a PciDeviceSpec,
    ) -> impl Iterator<Item = (&'a (String, String), &'a u32)> {
        self.pools.iter().filter(move |((vendor, product), _)| {
            spec.vendor_id.as_deref().map_or(true, |v| v == vendor)
                && spec.product_id.as_deref().map_or(true, |p| p == product)
        })
    }

    /// Whether every request in `requests` could be satisfied by the free
    /// devices currently in this host's pools, without reserving anything.
    /// Each request is all-or-nothing: its `count` must come from a single
    /// matching spec alternative, mirroring `PciDeviceStats.support_requests`.
    pub fn support_requests(&self, requests: &[PciRequest]) -> bool {
        requests.iter().all(|req| {
            req.spec
                .iter()
                .any(|spec| self.matching_pools(spec).map(|(_, n)| *n).sum::<u32>() >= req.count)
        })
    }

    /// Consumes devices for `requests` against this snapshot, mutating the
    /// pool counts. Checks `support_requests` for the whole batch first:
    /// either every request is satisfiable and every pool it draws from is
    /// decremented, or none of them are touched — matching
    /// `PciDeviceStats.apply_requests`'s all-or-nothing contract. Returns
    /// whether the batch was applied.
    pub fn apply_requests(&mut self, requests: &[PciRequest]) -> bool {
        if !self.support_requests(requests) {
            return false;
        }
        for req in requests {
            let Some(spec) = req
                .spec
                .iter()
                .find(|spec| self.matching_pools(spec).map(|(_, n)| *n).sum::<u32>() >= req.count)
            else {
                continue;
            };
            let mut remaining = req.count;
            let keys: Vec<(String, String)> = self
                .pools
                .iter()
                .filter(|((vendor, product), _)| {
                    spec.vendor_id.as_deref().map_or(true, |v| v == vendor)
                        && spec.product_id.as_deref().map_or(true, |p| p == product)
                })
                .map(|(k, _)| k.clone())
                .collect();
            for key in keys {
                if remaining == 0 {
                    break;
                }
                if let Some(n) = self.pools.get_mut(&key) {
                    let take = (*n).min(remaining);
                    *n -= take;
                    remaining -= take;
                }
            }
        }
        true
    }
}
