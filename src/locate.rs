use crate::error::OmadaError;
use crate::model::{SsidRecord, WlanGroup};
use crate::topology::TopologyItem;
use tracing::{debug, error};

/// An SSID found by name, with the group it lives in.
#[derive(Debug, Clone)]
pub struct Located {
    pub group: WlanGroup,
    pub ssid_id: String,
    pub ssid: SsidRecord,
}

/// Returns the first SSID named exactly `name`, consuming only as much of
/// the walk as needed.
///
/// Unreadable entries are skipped and counted so that a `NotFound` can say
/// whether the target might have been hidden in one of them. Any other error
/// ends the search.
pub fn locate<I>(items: I, name: &str) -> Result<Located, OmadaError>
where
    I: IntoIterator<Item = TopologyItem>,
{
    let mut skipped = 0;

    for item in items {
        let (group, ssid) = match item {
            Ok(pair) => pair,
            Err(OmadaError::Malformed(reason)) => {
                debug!(%reason, "skipping unreadable topology entry");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        if ssid.name() != Some(name) {
            continue;
        }

        let Some(ssid_id) = ssid.id().map(str::to_string) else {
            error!(ssid = name, group = %group.id, "matching SSID has no id");
            return Err(OmadaError::NotFound {
                name: name.to_string(),
                skipped,
            });
        };
        debug!(ssid = name, %ssid_id, group = %group.id, "located SSID");
        return Ok(Located {
            group,
            ssid_id,
            ssid,
        });
    }

    Err(OmadaError::NotFound {
        name: name.to_string(),
        skipped,
    })
}
