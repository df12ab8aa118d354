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

//! Wireless configuration objects as returned by the Omada controller.
//!
//! SSID documents are kept as the raw JSON object the controller sent.
//! The update endpoint replaces the whole resource, so every field this
//! crate does not know about has to survive a read-modify-write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_BAND: &str = "band";
pub const FIELD_BROADCAST: &str = "broadcast";
pub const FIELD_PMF_MODE: &str = "pmfMode";
pub const FIELD_MAC_FILTER_ENABLE: &str = "macFilterEnable";
pub const FIELD_MAC_FILTER_TYPE: &str = "macFilterType";
pub const FIELD_MAC_FILTER_LIST: &str = "macFilterList";
pub const FIELD_MAC_FILTER_ID: &str = "macFilterId";
pub const FIELD_POLICY: &str = "policy";

/// A container of SSIDs on a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WlanGroup {
    pub id: String,
    pub name: String,
}

impl WlanGroup {
    /// Builds a group from one entry of the `data` array. Entries without
    /// an id are rejected; a missing name is left empty.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value
            .get(FIELD_ID)?
            .as_str()
            .filter(|id| !id.is_empty())?
            .to_string();
        let name = value
            .get(FIELD_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self { id, name })
    }
}

/// One radio band an SSID can be advertised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radio {
    Ghz2_4,
    Ghz5,
    Ghz6,
}

impl Radio {
    pub const ALL: [Radio; 3] = [Radio::Ghz2_4, Radio::Ghz5, Radio::Ghz6];

    pub fn bit(self) -> u8 {
        match self {
            Radio::Ghz2_4 => 0b001,
            Radio::Ghz5 => 0b010,
            Radio::Ghz6 => 0b100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Radio::Ghz2_4 => "2.4GHz",
            Radio::Ghz5 => "5GHz",
            Radio::Ghz6 => "6GHz",
        }
    }

    #[cfg(test)]
    pub fn from_label(label: &str) -> Option<Self> {
        Radio::ALL.into_iter().find(|r| r.label() == label)
    }
}

/// The `band` bitmask of an SSID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Band(pub u8);

impl Band {
    /// 2.4GHz + 5GHz, the normal advertising set.
    pub const DUAL: Band = Band(0b011);
    /// 6GHz only.
    pub const SIX_ONLY: Band = Band(0b100);

    pub fn radios(self) -> Vec<Radio> {
        Radio::ALL
            .into_iter()
            .filter(|r| self.0 & r.bit() != 0)
            .collect()
    }

    #[cfg(test)]
    pub fn from_radios<I: IntoIterator<Item = Radio>>(radios: I) -> Self {
        Band(radios.into_iter().fold(0, |mask, r| mask | r.bit()))
    }

    pub fn labels(self) -> Vec<&'static str> {
        self.radios().into_iter().map(Radio::label).collect()
    }
}

/// `pmfMode` values understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PmfMode {
    Disabled,
    Mandatory,
    Optional,
}

impl PmfMode {
    pub fn code(self) -> i64 {
        match self {
            PmfMode::Disabled => 0,
            PmfMode::Mandatory => 1,
            PmfMode::Optional => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PmfMode::Disabled),
            1 => Some(PmfMode::Mandatory),
            2 => Some(PmfMode::Optional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacFilterType {
    Deny,
    Allow,
}

impl MacFilterType {
    pub fn code(self) -> i64 {
        match self {
            MacFilterType::Deny => 0,
            MacFilterType::Allow => 1,
        }
    }

    /// Anything other than `0` is treated as an allow list.
    pub fn from_code(code: i64) -> Self {
        if code == 0 {
            MacFilterType::Deny
        } else {
            MacFilterType::Allow
        }
    }
}

/// Full SSID document, unknown fields included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SsidRecord(Map<String, Value>);

impl SsidRecord {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0
            .get(FIELD_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get(FIELD_NAME).and_then(Value::as_str)
    }

    pub fn band(&self) -> Band {
        let raw = self.0.get(FIELD_BAND).and_then(Value::as_u64).unwrap_or(0);
        Band(u8::try_from(raw & 0b111).unwrap_or(0))
    }

    pub fn broadcast(&self) -> bool {
        self.bool_field(FIELD_BROADCAST)
    }

    pub fn pmf_mode(&self) -> Option<PmfMode> {
        self.0
            .get(FIELD_PMF_MODE)
            .and_then(Value::as_i64)
            .and_then(PmfMode::from_code)
    }

    pub fn mac_filter_enabled(&self) -> bool {
        self.bool_field(FIELD_MAC_FILTER_ENABLE)
    }

    pub fn mac_filter_type(&self) -> MacFilterType {
        let code = self
            .0
            .get(FIELD_MAC_FILTER_TYPE)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        MacFilterType::from_code(code)
    }

    pub fn mac_filter_count(&self) -> usize {
        self.0
            .get(FIELD_MAC_FILTER_LIST)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn bool_field(&self, field: &str) -> bool {
        self.0.get(field).and_then(Value::as_bool).unwrap_or(false)
    }
}
