// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC GlobalId values
//!
//! IFC stores a 128-bit GUID as 22 characters of its own base-64 alphabet.
//! Exported GUIDs are derived from stable seeds so re-exporting the same
//! model yields the same ids.

use crate::element::LevelId;
use crate::splitter::PartOrGeometry;
use std::fmt;
use uuid::Uuid;

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Length of the compressed form
pub const ENCODED_LEN: usize = 22;

/// Namespace for name-based export GUIDs
const EXPORT_NAMESPACE: Uuid = Uuid::from_u128(0x8f2c_4b1e_6a3d_4e57_9c0b_d1a2_e3f4_0516);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfcGuid(Uuid);

impl IfcGuid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Name-based (version 5) GUID for `seed`
    pub fn derive(seed: &str) -> Self {
        Self(Uuid::new_v5(&EXPORT_NAMESPACE, seed.as_bytes()))
    }

    pub fn encode(&self) -> String {
        let mut out = [0u8; ENCODED_LEN];
        let mut n = self.0.as_u128();
        for slot in out.iter_mut().rev() {
            *slot = ALPHABET[(n & 63) as usize];
            n >>= 6;
        }
        out.iter().map(|&b| b as char).collect()
    }

    /// Parse the compressed form; `None` for bad length, characters or overflow
    pub fn decode(text: &str) -> Option<Self> {
        if text.len() != ENCODED_LEN {
            return None;
        }
        let mut n: u128 = 0;
        for (i, byte) in text.bytes().enumerate() {
            let value = ALPHABET.iter().position(|&c| c == byte)? as u128;
            // The leading character only carries two bits
            if i == 0 && value > 3 {
                return None;
            }
            n = (n << 6) | value;
        }
        Some(Self(Uuid::from_u128(n)))
    }
}

impl From<Uuid> for IfcGuid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for IfcGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// GUID for an exported fragment
///
/// Parts keep a GUID tied to the part alone, so re-hosting a part keeps
/// its id; transient geometry fragments derive theirs from the host and
/// their index. Fragments exported on several levels get one GUID per level.
pub fn fragment_guid(host_unique_id: &str, source: &PartOrGeometry, level: Option<LevelId>) -> IfcGuid {
    let mut seed = match source {
        PartOrGeometry::Part(part) => format!("part/{}", part.0),
        PartOrGeometry::Geometry { index, .. } => format!("{}/geometry/{}", host_unique_id, index),
    };
    if let Some(level) = level {
        seed.push_str(&format!("/level/{}", level.0));
    }
    IfcGuid::derive(&seed)
}
