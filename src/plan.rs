// omadactl - SSID control for Omada controllers
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Turning a desired on/off state into the document sent to the controller.
//!
//! The update endpoint replaces the whole SSID, so every plan starts from
//! the record as read and only overrides or drops the fields its strategy
//! owns.

use crate::model::{
    Band, FIELD_BAND, FIELD_BROADCAST, FIELD_MAC_FILTER_ENABLE, FIELD_MAC_FILTER_ID,
    FIELD_MAC_FILTER_LIST, FIELD_MAC_FILTER_TYPE, FIELD_PMF_MODE, FIELD_POLICY, MacFilterType,
    PmfMode, SsidRecord,
};
use serde_json::json;

/// How an SSID is taken offline. Chosen by the caller, never inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Keep broadcasting but switch to an empty allow list so no client can
    /// associate. `mac_filter_id` names the controller-side MAC group the
    /// filter points at.
    MacFilter { mac_filter_id: String },
    /// Stop broadcasting, move to 6GHz only and require PMF.
    Broadcast,
}

impl Strategy {
    /// Human-readable result of applying this strategy, for the success line.
    pub fn describe(&self, enabled: bool) -> &'static str {
        match (self, enabled) {
            (Strategy::MacFilter { .. }, true) => "activé (filtrage MAC désactivé)",
            (Strategy::MacFilter { .. }, false) => {
                "désactivé (filtrage MAC en mode autorisation, liste vide)"
            }
            (Strategy::Broadcast, true) => "activé (visible, 2.4+5 GHz, pmf optional)",
            (Strategy::Broadcast, false) => "désactivé (masqué, 6 GHz, pmf mandatory)",
        }
    }
}

/// Fields removed when the MAC filter is switched off, so the controller
/// falls back to its defaults instead of keeping a stale list.
const MAC_FILTER_FIELDS: [&str; 4] = [
    FIELD_MAC_FILTER_LIST,
    FIELD_MAC_FILTER_TYPE,
    FIELD_POLICY,
    FIELD_MAC_FILTER_ID,
];

/// Allow-list policy value the controller expects alongside `macFilterType = 1`.
const ALLOW_POLICY: i64 = 1;

pub fn plan(current: &SsidRecord, enabled: bool, strategy: &Strategy) -> SsidRecord {
    let mut next = current.clone();
    match strategy {
        Strategy::MacFilter { mac_filter_id } => {
            if enabled {
                next.set(FIELD_MAC_FILTER_ENABLE, false);
                for field in MAC_FILTER_FIELDS {
                    next.remove(field);
                }
            } else {
                next.set(FIELD_MAC_FILTER_ENABLE, true);
                next.set(FIELD_POLICY, ALLOW_POLICY);
                next.set(FIELD_MAC_FILTER_TYPE, MacFilterType::Allow.code());
                next.set(FIELD_MAC_FILTER_LIST, json!([]));
                next.set(FIELD_MAC_FILTER_ID, mac_filter_id.as_str());
            }
        }
        Strategy::Broadcast => {
            let (band, pmf) = if enabled {
                (Band::DUAL, PmfMode::Optional)
            } else {
                (Band::SIX_ONLY, PmfMode::Mandatory)
            };
            next.set(FIELD_BROADCAST, enabled);
            next.set(FIELD_BAND, band.0);
            next.set(FIELD_PMF_MODE, pmf.code());
        }
    }
    next
}
