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

//! Site → WLAN group → SSID traversal.

use crate::client::ControllerApi;
use crate::error::OmadaError;
use crate::model::{SsidRecord, WlanGroup};
use serde_json::Value;
use std::vec::IntoIter;
use tracing::debug;

pub type TopologyItem = Result<(WlanGroup, SsidRecord), OmadaError>;

pub fn groups_path(site: &str) -> String {
    format!("/sites/{site}/setting/wlans")
}

pub fn ssids_path(site: &str, group_id: &str) -> String {
    format!("/sites/{site}/setting/wlans/{group_id}/ssids")
}

pub fn ssid_path(site: &str, group_id: &str, ssid_id: &str) -> String {
    format!("/sites/{site}/setting/wlans/{group_id}/ssids/{ssid_id}")
}

/// Lazy, single-pass stream of `(group, ssid)` pairs in controller order.
///
/// The group list is fetched up front; each group's SSIDs are fetched only
/// when the iterator reaches that group, so a consumer that stops early
/// saves the remaining calls. Unreadable entries come out as
/// `Err(OmadaError::Malformed)` items and the walk carries on after them.
pub struct TopologyWalk<'a, A: ControllerApi + ?Sized> {
    api: &'a mut A,
    site: String,
    groups: IntoIter<Value>,
    current: Option<(WlanGroup, IntoIter<Value>)>,
}

/// Starts a walk. Fails only if the group list itself cannot be read.
pub fn walk<'a, A: ControllerApi + ?Sized>(
    api: &'a mut A,
    site: &str,
) -> Result<TopologyWalk<'a, A>, OmadaError> {
    let result = api.get(&groups_path(site))?;
    let groups = data_array(result).ok_or_else(|| {
        OmadaError::Malformed(format!("WLAN group list for site {site} has no data"))
    })?;
    debug!(site, count = groups.len(), "fetched WLAN groups");

    Ok(TopologyWalk {
        api,
        site: site.to_string(),
        groups: groups.into_iter(),
        current: None,
    })
}

impl<A: ControllerApi + ?Sized> Iterator for TopologyWalk<'_, A> {
    type Item = TopologyItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((group, ssids)) = self.current.as_mut() {
                if let Some(raw) = ssids.next() {
                    let item = match SsidRecord::from_value(raw) {
                        Some(ssid) => Ok((group.clone(), ssid)),
                        None => Err(OmadaError::Malformed(format!(
                            "non-object SSID entry in group '{}'",
                            group.id
                        ))),
                    };
                    return Some(item);
                }
                self.current = None;
            }

            let raw = self.groups.next()?;
            let Some(group) = WlanGroup::from_value(&raw) else {
                return Some(Err(OmadaError::Malformed(
                    "WLAN group entry without id".into(),
                )));
            };

            debug!(group = %group.name, id = %group.id, "fetching SSIDs");
            let result = match self.api.get(&ssids_path(&self.site, &group.id)) {
                Ok(result) => result,
                Err(err) => return Some(Err(err)),
            };
            match data_array(result) {
                Some(ssids) => self.current = Some((group, ssids.into_iter())),
                None => {
                    return Some(Err(OmadaError::Malformed(format!(
                        "SSID list of group '{}' has no data",
                        group.id
                    ))));
                }
            }
        }
    }
}

fn data_array(result: Value) -> Option<Vec<Value>> {
    match result {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}
