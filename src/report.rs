//! Read-only listing of every SSID on a site.

use crate::client::ControllerApi;
use crate::error::OmadaError;
use crate::model::{MacFilterType, PmfMode, SsidRecord, WlanGroup};
use crate::topology::walk;
use serde::Serialize;
use std::fmt::{self, Write as _};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub groups: Vec<GroupListing>,
    /// Entries that could not be read and were left out.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupListing {
    pub id: String,
    pub name: String,
    pub ssids: Vec<SsidSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SsidSummary {
    pub id: String,
    pub name: String,
    pub bands: Vec<&'static str>,
    pub broadcast: bool,
    pub pmf: Option<PmfMode>,
    pub mac_filter: MacFilterSummary,
    #[serde(skip)]
    pub raw: SsidRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MacFilterSummary {
    Disabled,
    Enabled {
        mode: MacFilterType,
        entries: usize,
        /// Allow list with no entries: nobody can associate.
        effectively_disabled: bool,
    },
}

impl MacFilterSummary {
    pub fn of(ssid: &SsidRecord) -> Self {
        if !ssid.mac_filter_enabled() {
            return MacFilterSummary::Disabled;
        }
        let mode = ssid.mac_filter_type();
        let entries = ssid.mac_filter_count();
        MacFilterSummary::Enabled {
            mode,
            entries,
            effectively_disabled: mode == MacFilterType::Allow && entries == 0,
        }
    }
}

impl fmt::Display for MacFilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacFilterSummary::Disabled => write!(f, "Filtrage MAC: Désactivé"),
            MacFilterSummary::Enabled {
                mode,
                entries,
                effectively_disabled,
            } => {
                let mode = match mode {
                    MacFilterType::Deny => "Interdiction",
                    MacFilterType::Allow => "Autorisation",
                };
                write!(
                    f,
                    "Filtrage MAC: Activé ({mode}) - {entries} appareil(s) dans la liste"
                )?;
                if *effectively_disabled {
                    write!(f, " - SSID effectivement désactivé")?;
                }
                Ok(())
            }
        }
    }
}

impl SsidSummary {
    pub fn of(ssid: SsidRecord) -> Self {
        Self {
            id: ssid.id().unwrap_or_default().to_string(),
            name: ssid.name().unwrap_or("Sans nom").to_string(),
            bands: ssid.band().labels(),
            broadcast: ssid.broadcast(),
            pmf: ssid.pmf_mode(),
            mac_filter: MacFilterSummary::of(&ssid),
            raw: ssid,
        }
    }

    pub fn bands_line(&self) -> String {
        if self.bands.is_empty() {
            "Bandes: Aucune".to_string()
        } else {
            format!("Bandes: {}", self.bands.join(", "))
        }
    }
}

/// Walks the whole site, no short-circuit. Unreadable entries are skipped
/// and counted; any other failure aborts the listing.
pub fn report<A: ControllerApi + ?Sized>(api: &mut A, site: &str) -> Result<Listing, OmadaError> {
    let mut groups: Vec<GroupListing> = Vec::new();
    let mut skipped = 0;

    for item in walk(api, site)? {
        let (group, ssid) = match item {
            Ok(pair) => pair,
            Err(OmadaError::Malformed(reason)) => {
                debug!(%reason, "skipping unreadable topology entry");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        if group.name.is_empty() {
            debug!(group = %group.id, "skipping SSID of unnamed WLAN group");
            skipped += 1;
            continue;
        }
        debug!(
            "SSID details: {}",
            serde_json::to_string_pretty(&ssid).unwrap_or_default()
        );
        push(&mut groups, group, SsidSummary::of(ssid));
    }

    info!(groups = groups.len(), skipped, "listed wireless networks");
    Ok(Listing { groups, skipped })
}

fn push(groups: &mut Vec<GroupListing>, group: WlanGroup, ssid: SsidSummary) {
    match groups.last_mut() {
        Some(last) if last.id == group.id => last.ssids.push(ssid),
        _ => groups.push(GroupListing {
            id: group.id,
            name: group.name,
            ssids: vec![ssid],
        }),
    }
}

/// Text rendering used by `ssid list`.
pub fn render(listing: &Listing) -> String {
    let mut out = String::from("\nListe des réseaux sans fil configurés:\n");
    if listing.groups.is_empty() {
        out.push_str("\nAucun réseau sans fil trouvé\n");
    }
    for group in &listing.groups {
        let _ = writeln!(out, "\nGroupe: {}", group.name);
        for ssid in &group.ssids {
            let _ = writeln!(out, "  - SSID: {} (ID: {})", ssid.name, ssid.id);
            let _ = writeln!(out, "    {}", ssid.bands_line());
            let _ = writeln!(out, "    {}", ssid.mac_filter);
        }
    }
    if listing.skipped > 0 {
        let _ = writeln!(
            out,
            "\n{} entrée(s) illisible(s) ignorée(s), relancer avec --debug pour le détail",
            listing.skipped
        );
    }
    out
}
