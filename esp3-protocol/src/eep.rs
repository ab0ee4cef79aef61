//! EnOcean Equipment Profile (EEP) field decoding.
//!
//! A profile is identified by the (RORG, FUNC, TYPE) triple and fixes the
//! bit layout of a telegram's user data. Bit offsets are counted MSB-first
//! from the first user-data byte, the way the EEP specification tabulates
//! them. The table is plain static data handed to the decoder explicitly;
//! there is no process-wide registry.

use serde::Serialize;

use crate::packet::rorg;

/// Linear mapping from a raw bit-field range onto an engineering range.
///
/// Several profiles run the raw range backwards (e.g. A5-02 temperature
/// sensors map 255..0 onto 0..40 °C); `raw_min` > `raw_max` expresses
/// that directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub raw_min: u64,
    pub raw_max: u64,
    pub min: f64,
    pub max: f64,
}

impl Scaling {
    fn apply(self, raw: u64) -> f64 {
        if self.raw_min == self.raw_max {
            return self.min;
        }
        let span = self.raw_max as f64 - self.raw_min as f64;
        let t = (raw as f64 - self.raw_min as f64) / span;
        self.min + t * (self.max - self.min)
    }
}

/// A single decodable field of a profile.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// EEP shortcut name, e.g. "TMP".
    pub name: &'static str,
    pub description: &'static str,
    /// Bit offset into the user data, MSB-first.
    pub offset: u16,
    /// Field width in bits.
    pub size: u16,
    /// Engineering-unit mapping; raw fields (flags, enums) carry none.
    pub scaling: Option<Scaling>,
}

/// One equipment profile.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub rorg: u8,
    pub func: u8,
    pub ty: u8,
    pub name: &'static str,
    pub fields: &'static [FieldRule],
}

impl Profile {
    /// Decode every field of this profile from a telegram's user data.
    /// Bits beyond the supplied data read as zero.
    pub fn decode(&self, user_data: &[u8]) -> Vec<FieldValue> {
        self.fields
            .iter()
            .map(|field| {
                let raw = extract_bits(user_data, field.offset, field.size);
                FieldValue {
                    name: field.name,
                    raw,
                    value: field.scaling.map(|scaling| scaling.apply(raw)),
                }
            })
            .collect()
    }
}

/// A decoded field value: the raw bits and, for scaled fields, the value
/// in engineering units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValue {
    pub name: &'static str,
    pub raw: u64,
    pub value: Option<f64>,
}

/// Immutable profile lookup table.
#[derive(Debug, Clone, Copy)]
pub struct EepTable {
    profiles: &'static [Profile],
}

impl EepTable {
    /// The built-in profile set.
    pub const fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROFILES,
        }
    }

    /// Look up a profile by its identifying triple.
    pub fn find(&self, rorg: u8, func: u8, ty: u8) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.rorg == rorg && p.func == func && p.ty == ty)
    }
}

fn extract_bits(data: &[u8], offset: u16, size: u16) -> u64 {
    let mut value = 0u64;
    for i in 0..size {
        let bit = offset + i;
        let byte = usize::from(bit / 8);
        let shift = 7 - (bit % 8);
        let set = data.get(byte).is_some_and(|b| b >> shift & 1 == 1);
        value = value << 1 | u64::from(set);
    }
    value
}

const BUILTIN_PROFILES: &[Profile] = &[
    Profile {
        rorg: rorg::RPS,
        func: 0x02,
        ty: 0x01,
        name: "Rocker switch, 2 rockers",
        fields: &[
            FieldRule {
                name: "R1",
                description: "Rocker 1st action",
                offset: 0,
                size: 3,
                scaling: None,
            },
            FieldRule {
                name: "EB",
                description: "Energy bow",
                offset: 3,
                size: 1,
                scaling: None,
            },
            FieldRule {
                name: "R2",
                description: "Rocker 2nd action",
                offset: 4,
                size: 3,
                scaling: None,
            },
            FieldRule {
                name: "SA",
                description: "2nd action valid",
                offset: 7,
                size: 1,
                scaling: None,
            },
        ],
    },
    Profile {
        rorg: rorg::BS1,
        func: 0x00,
        ty: 0x01,
        name: "Single input contact",
        fields: &[
            FieldRule {
                name: "LRN",
                description: "Learn button",
                offset: 4,
                size: 1,
                scaling: None,
            },
            FieldRule {
                name: "CO",
                description: "Contact",
                offset: 7,
                size: 1,
                scaling: None,
            },
        ],
    },
    Profile {
        rorg: rorg::BS4,
        func: 0x02,
        ty: 0x05,
        name: "Temperature sensor, 0 °C to 40 °C",
        fields: &[
            FieldRule {
                name: "TMP",
                description: "Temperature",
                offset: 16,
                size: 8,
                scaling: Some(Scaling {
                    raw_min: 255,
                    raw_max: 0,
                    min: 0.0,
                    max: 40.0,
                }),
            },
            FieldRule {
                name: "LRN",
                description: "Learn bit",
                offset: 28,
                size: 1,
                scaling: None,
            },
        ],
    },
    Profile {
        rorg: rorg::BS4,
        func: 0x04,
        ty: 0x01,
        name: "Temperature and humidity sensor",
        fields: &[
            FieldRule {
                name: "HUM",
                description: "Relative humidity",
                offset: 8,
                size: 8,
                scaling: Some(Scaling {
                    raw_min: 0,
                    raw_max: 250,
                    min: 0.0,
                    max: 100.0,
                }),
            },
            FieldRule {
                name: "TMP",
                description: "Temperature",
                offset: 16,
                size: 8,
                scaling: Some(Scaling {
                    raw_min: 0,
                    raw_max: 250,
                    min: 0.0,
                    max: 40.0,
                }),
            },
            FieldRule {
                name: "LRN",
                description: "Learn bit",
                offset: 28,
                size: 1,
                scaling: None,
            },
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RadioPacket;

    #[test]
    fn bit_extraction() {
        let data = [0b0101_0000, 0b1111_0001];
        assert_eq!(extract_bits(&data, 0, 3), 0b010);
        assert_eq!(extract_bits(&data, 3, 1), 1);
        assert_eq!(extract_bits(&data, 4, 3), 0);
        assert_eq!(extract_bits(&data, 8, 8), 0b1111_0001);
        assert_eq!(extract_bits(&data, 4, 8), 0b0000_1111);
        // Bits past the end of the data read as zero.
        assert_eq!(extract_bits(&data, 14, 4), 0b0100);
    }

    #[test]
    fn lookup_hits_and_misses() {
        let table = EepTable::builtin();
        assert!(table.find(rorg::BS4, 0x02, 0x05).is_some());
        assert!(table.find(rorg::BS4, 0x99, 0x01).is_none());
        assert!(table.find(0x00, 0x02, 0x05).is_none());
    }

    #[test]
    fn temperature_scale_runs_backwards() {
        let table = EepTable::builtin();
        let profile = table.find(rorg::BS4, 0x02, 0x05).unwrap();

        let coldest = profile.decode(&[0x00, 0x00, 0xFF, 0x08]);
        let tmp = coldest.iter().find(|f| f.name == "TMP").unwrap();
        assert_eq!(tmp.raw, 255);
        assert_eq!(tmp.value, Some(0.0));

        let warmest = profile.decode(&[0x00, 0x00, 0x00, 0x08]);
        let tmp = warmest.iter().find(|f| f.name == "TMP").unwrap();
        assert_eq!(tmp.value, Some(40.0));

        let lrn = warmest.iter().find(|f| f.name == "LRN").unwrap();
        assert_eq!(lrn.raw, 1);
        assert_eq!(lrn.value, None);
    }

    #[test]
    fn humidity_and_temperature_decode() {
        let table = EepTable::builtin();
        let profile = table.find(rorg::BS4, 0x04, 0x01).unwrap();
        let fields = profile.decode(&[0x00, 0xFA, 0x7D, 0x08]);

        let hum = fields.iter().find(|f| f.name == "HUM").unwrap();
        assert_eq!(hum.value, Some(100.0));
        let tmp = fields.iter().find(|f| f.name == "TMP").unwrap();
        assert_eq!(tmp.raw, 125);
        assert_eq!(tmp.value, Some(20.0));
    }

    #[test]
    fn rocker_switch_decode() {
        let table = EepTable::builtin();
        let profile = table.find(rorg::RPS, 0x02, 0x01).unwrap();
        let fields = profile.decode(&[0x50]);

        assert_eq!(fields.iter().find(|f| f.name == "R1").unwrap().raw, 2);
        assert_eq!(fields.iter().find(|f| f.name == "EB").unwrap().raw, 1);
        assert_eq!(fields.iter().find(|f| f.name == "R2").unwrap().raw, 0);
        assert_eq!(fields.iter().find(|f| f.name == "SA").unwrap().raw, 0);
    }

    #[test]
    fn radio_packet_decoding_is_injected() {
        let table = EepTable::builtin();
        let packet = RadioPacket::erp1(rorg::BS4, &[0x00, 0x00, 0x7F, 0x08], [1, 2, 3, 4], 0);

        let fields = packet.decode_eep(&table, 0x02, 0x05).unwrap();
        let tmp = fields.iter().find(|f| f.name == "TMP").unwrap();
        assert_eq!(tmp.raw, 0x7F);

        // A profile the table does not list is unknown, not an error.
        assert!(packet.decode_eep(&table, 0x7F, 0x01).is_none());
    }
}
