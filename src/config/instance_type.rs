//! EC2 instance types accepted for cluster worker nodes.
//!
//! The catalogue covers every current and previous generation type that EKS
//! worker nodes can be launched with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares the instance type enum, its lookup table and its AWS names from
/// one list so the three cannot drift apart.
macro_rules! instance_types {
    ($($variant:ident => $name:literal,)+) => {
        /// An EC2 instance type that worker nodes can be launched with.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "&'static str", try_from = "String")]
        #[allow(missing_docs, non_camel_case_types)]
        pub enum InstanceType {
            $($variant,)+
        }

        impl InstanceType {
            /// Every known instance type, in catalogue order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Returns the AWS name of the instance type.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

instance_types! {
    A1Medium => "a1.medium",
    A1Large => "a1.large",
    A1Xlarge => "a1.xlarge",
    A1_2Xlarge => "a1.2xlarge",
    A1_4Xlarge => "a1.4xlarge",
    A1Metal => "a1.metal",
    C1Medium => "c1.medium",
    C1Xlarge => "c1.xlarge",
    C3Large => "c3.large",
    C3Xlarge => "c3.xlarge",
    C3_2Xlarge => "c3.2xlarge",
    C3_4Xlarge => "c3.4xlarge",
    C3_8Xlarge => "c3.8xlarge",
    C4Large => "c4.large",
    C4Xlarge => "c4.xlarge",
    C4_2Xlarge => "c4.2xlarge",
    C4_4Xlarge => "c4.4xlarge",
    C4_8Xlarge => "c4.8xlarge",
    C5Large => "c5.large",
    C5Xlarge => "c5.xlarge",
    C5_2Xlarge => "c5.2xlarge",
    C5_4Xlarge => "c5.4xlarge",
    C5_9Xlarge => "c5.9xlarge",
    C5_12Xlarge => "c5.12xlarge",
    C5_18Xlarge => "c5.18xlarge",
    C5_24Xlarge => "c5.24xlarge",
    C5Metal => "c5.metal",
    C5dLarge => "c5d.large",
    C5dXlarge => "c5d.xlarge",
    C5d_2Xlarge => "c5d.2xlarge",
    C5d_4Xlarge => "c5d.4xlarge",
    C5d_9Xlarge => "c5d.9xlarge",
    C5d_12Xlarge => "c5d.12xlarge",
    C5d_18Xlarge => "c5d.18xlarge",
    C5d_24Xlarge => "c5d.24xlarge",
    C5dMetal => "c5d.metal",
    C5nLarge => "c5n.large",
    C5nXlarge => "c5n.xlarge",
    C5n_2Xlarge => "c5n.2xlarge",
    C5n_4Xlarge => "c5n.4xlarge",
    C5n_9Xlarge => "c5n.9xlarge",
    C5n_18Xlarge => "c5n.18xlarge",
    C5nMetal => "c5n.metal",
    Cc2_8Xlarge => "cc2.8xlarge",
    Cr1_8Xlarge => "cr1.8xlarge",
    D2Xlarge => "d2.xlarge",
    D2_2Xlarge => "d2.2xlarge",
    D2_4Xlarge => "d2.4xlarge",
    D2_8Xlarge => "d2.8xlarge",
    F1_2Xlarge => "f1.2xlarge",
    F1_4Xlarge => "f1.4xlarge",
    F1_16Xlarge => "f1.16xlarge",
    G2_2Xlarge => "g2.2xlarge",
    G2_8Xlarge => "g2.8xlarge",
    G3_4Xlarge => "g3.4xlarge",
    G3_8Xlarge => "g3.8xlarge",
    G3_16Xlarge => "g3.16xlarge",
    G3sXlarge => "g3s.xlarge",
    G4dnXlarge => "g4dn.xlarge",
    G4dn_2Xlarge => "g4dn.2xlarge",
    G4dn_4Xlarge => "g4dn.4xlarge",
    G4dn_8Xlarge => "g4dn.8xlarge",
    G4dn_12Xlarge => "g4dn.12xlarge",
    G4dn_16Xlarge => "g4dn.16xlarge",
    G4dnMetal => "g4dn.metal",
    H1_2Xlarge => "h1.2xlarge",
    H1_4Xlarge => "h1.4xlarge",
    H1_8Xlarge => "h1.8xlarge",
    H1_16Xlarge => "h1.16xlarge",
    Hs1_8Xlarge => "hs1.8xlarge",
    I2Xlarge => "i2.xlarge",
    I2_2Xlarge => "i2.2xlarge",
    I2_4Xlarge => "i2.4xlarge",
    I2_8Xlarge => "i2.8xlarge",
    I3Large => "i3.large",
    I3Xlarge => "i3.xlarge",
    I3_2Xlarge => "i3.2xlarge",
    I3_4Xlarge => "i3.4xlarge",
    I3_8Xlarge => "i3.8xlarge",
    I3_16Xlarge => "i3.16xlarge",
    I3Metal => "i3.metal",
    I3enLarge => "i3en.large",
    I3enXlarge => "i3en.xlarge",
    I3en_2Xlarge => "i3en.2xlarge",
    I3en_3Xlarge => "i3en.3xlarge",
    I3en_6Xlarge => "i3en.6xlarge",
    I3en_12Xlarge => "i3en.12xlarge",
    I3en_24Xlarge => "i3en.24xlarge",
    I3enMetal => "i3en.metal",
    M1Small => "m1.small",
    M1Medium => "m1.medium",
    M1Large => "m1.large",
    M1Xlarge => "m1.xlarge",
    M2Xlarge => "m2.xlarge",
    M2_2Xlarge => "m2.2xlarge",
    M2_4Xlarge => "m2.4xlarge",
    M3Medium => "m3.medium",
    M3Large => "m3.large",
    M3Xlarge => "m3.xlarge",
    M3_2Xlarge => "m3.2xlarge",
    M4Large => "m4.large",
    M4Xlarge => "m4.xlarge",
    M4_2Xlarge => "m4.2xlarge",
    M4_4Xlarge => "m4.4xlarge",
    M4_10Xlarge => "m4.10xlarge",
    M4_16Xlarge => "m4.16xlarge",
    M5Large => "m5.large",
    M5Xlarge => "m5.xlarge",
    M5_2Xlarge => "m5.2xlarge",
    M5_4Xlarge => "m5.4xlarge",
    M5_8Xlarge => "m5.8xlarge",
    M5_12Xlarge => "m5.12xlarge",
    M5_16Xlarge => "m5.16xlarge",
    M5_24Xlarge => "m5.24xlarge",
    M5Metal => "m5.metal",
    M5aLarge => "m5a.large",
    M5aXlarge => "m5a.xlarge",
    M5a_2Xlarge => "m5a.2xlarge",
    M5a_4Xlarge => "m5a.4xlarge",
    M5a_8Xlarge => "m5a.8xlarge",
    M5a_12Xlarge => "m5a.12xlarge",
    M5a_16Xlarge => "m5a.16xlarge",
    M5a_24Xlarge => "m5a.24xlarge",
    M5adLarge => "m5ad.large",
    M5adXlarge => "m5ad.xlarge",
    M5ad_2Xlarge => "m5ad.2xlarge",
    M5ad_4Xlarge => "m5ad.4xlarge",
    M5ad_12Xlarge => "m5ad.12xlarge",
    M5ad_24Xlarge => "m5ad.24xlarge",
    M5dLarge => "m5d.large",
    M5dXlarge => "m5d.xlarge",
    M5d_2Xlarge => "m5d.2xlarge",
    M5d_4Xlarge => "m5d.4xlarge",
    M5d_8Xlarge => "m5d.8xlarge",
    M5d_12Xlarge => "m5d.12xlarge",
    M5d_16Xlarge => "m5d.16xlarge",
    M5d_24Xlarge => "m5d.24xlarge",
    M5dMetal => "m5d.metal",
    M5dnLarge => "m5dn.large",
    M5dnXlarge => "m5dn.xlarge",
    M5dn_2Xlarge => "m5dn.2xlarge",
    M5dn_4Xlarge => "m5dn.4xlarge",
    M5dn_8Xlarge => "m5dn.8xlarge",
    M5dn_12Xlarge => "m5dn.12xlarge",
    M5dn_16Xlarge => "m5dn.16xlarge",
    M5dn_24Xlarge => "m5dn.24xlarge",
    M5nLarge => "m5n.large",
    M5nXlarge => "m5n.xlarge",
    M5n_2Xlarge => "m5n.2xlarge",
    M5n_4Xlarge => "m5n.4xlarge",
    M5n_8Xlarge => "m5n.8xlarge",
    M5n_12Xlarge => "m5n.12xlarge",
    M5n_16Xlarge => "m5n.16xlarge",
    M5n_24Xlarge => "m5n.24xlarge",
    P2Xlarge => "p2.xlarge",
    P2_8Xlarge => "p2.8xlarge",
    P2_16Xlarge => "p2.16xlarge",
    P3_2Xlarge => "p3.2xlarge",
    P3_8Xlarge => "p3.8xlarge",
    P3_16Xlarge => "p3.16xlarge",
    P3dn_24Xlarge => "p3dn.24xlarge",
    R3Large => "r3.large",
    R3Xlarge => "r3.xlarge",
    R3_2Xlarge => "r3.2xlarge",
    R3_4Xlarge => "r3.4xlarge",
    R3_8Xlarge => "r3.8xlarge",
    R4Large => "r4.large",
    R4Xlarge => "r4.xlarge",
    R4_2Xlarge => "r4.2xlarge",
    R4_4Xlarge => "r4.4xlarge",
    R4_8Xlarge => "r4.8xlarge",
    R4_16Xlarge => "r4.16xlarge",
    R5Large => "r5.large",
    R5Xlarge => "r5.xlarge",
    R5_2Xlarge => "r5.2xlarge",
    R5_4Xlarge => "r5.4xlarge",
    R5_8Xlarge => "r5.8xlarge",
    R5_12Xlarge => "r5.12xlarge",
    R5_16Xlarge => "r5.16xlarge",
    R5_24Xlarge => "r5.24xlarge",
    R5Metal => "r5.metal",
    R5aLarge => "r5a.large",
    R5aXlarge => "r5a.xlarge",
    R5a_2Xlarge => "r5a.2xlarge",
    R5a_4Xlarge => "r5a.4xlarge",
    R5a_8Xlarge => "r5a.8xlarge",
    R5a_12Xlarge => "r5a.12xlarge",
    R5a_16Xlarge => "r5a.16xlarge",
    R5a_24Xlarge => "r5a.24xlarge",
    R5adLarge => "r5ad.large",
    R5adXlarge => "r5ad.xlarge",
    R5ad_2Xlarge => "r5ad.2xlarge",
    R5ad_4Xlarge => "r5ad.4xlarge",
    R5ad_12Xlarge => "r5ad.12xlarge",
    R5ad_24Xlarge => "r5ad.24xlarge",
    R5dLarge => "r5d.large",
    R5dXlarge => "r5d.xlarge",
    R5d_2Xlarge => "r5d.2xlarge",
    R5d_4Xlarge => "r5d.4xlarge",
    R5d_8Xlarge => "r5d.8xlarge",
    R5d_12Xlarge => "r5d.12xlarge",
    R5d_16Xlarge => "r5d.16xlarge",
    R5d_24Xlarge => "r5d.24xlarge",
    R5dMetal => "r5d.metal",
    R5dnLarge => "r5dn.large",
    R5dnXlarge => "r5dn.xlarge",
    R5dn_2Xlarge => "r5dn.2xlarge",
    R5dn_4Xlarge => "r5dn.4xlarge",
    R5dn_8Xlarge => "r5dn.8xlarge",
    R5dn_12Xlarge => "r5dn.12xlarge",
    R5dn_16Xlarge => "r5dn.16xlarge",
    R5dn_24Xlarge => "r5dn.24xlarge",
    R5nLarge => "r5n.large",
    R5nXlarge => "r5n.xlarge",
    R5n_2Xlarge => "r5n.2xlarge",
    R5n_4Xlarge => "r5n.4xlarge",
    R5n_8Xlarge => "r5n.8xlarge",
    R5n_12Xlarge => "r5n.12xlarge",
    R5n_16Xlarge => "r5n.16xlarge",
    R5n_24Xlarge => "r5n.24xlarge",
    T1Micro => "t1.micro",
    T2Nano => "t2.nano",
    T2Micro => "t2.micro",
    T2Small => "t2.small",
    T2Medium => "t2.medium",
    T2Large => "t2.large",
    T2Xlarge => "t2.xlarge",
    T2_2Xlarge => "t2.2xlarge",
    T3Nano => "t3.nano",
    T3Micro => "t3.micro",
    T3Small => "t3.small",
    T3Medium => "t3.medium",
    T3Large => "t3.large",
    T3Xlarge => "t3.xlarge",
    T3_2Xlarge => "t3.2xlarge",
    T3aNano => "t3a.nano",
    T3aMicro => "t3a.micro",
    T3aSmall => "t3a.small",
    T3aMedium => "t3a.medium",
    T3aLarge => "t3a.large",
    T3aXlarge => "t3a.xlarge",
    T3a_2Xlarge => "t3a.2xlarge",
    U6tb1Metal => "u-6tb1.metal",
    U9tb1Metal => "u-9tb1.metal",
    U12tb1Metal => "u-12tb1.metal",
    X1_16Xlarge => "x1.16xlarge",
    X1_32Xlarge => "x1.32xlarge",
    X1eXlarge => "x1e.xlarge",
    X1e_2Xlarge => "x1e.2xlarge",
    X1e_4Xlarge => "x1e.4xlarge",
    X1e_8Xlarge => "x1e.8xlarge",
    X1e_16Xlarge => "x1e.16xlarge",
    X1e_32Xlarge => "x1e.32xlarge",
    Z1dLarge => "z1d.large",
    Z1dXlarge => "z1d.xlarge",
    Z1d_2Xlarge => "z1d.2xlarge",
    Z1d_3Xlarge => "z1d.3xlarge",
    Z1d_6Xlarge => "z1d.6xlarge",
    Z1d_12Xlarge => "z1d.12xlarge",
    Z1dMetal => "z1d.metal",
}

impl InstanceType {
    /// Looks up an instance type by its AWS name.
    ///
    /// The whole table is scanned and the last entry whose name matches wins.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .fold(None, |found, candidate| {
                if candidate.as_str() == name {
                    Some(*candidate)
                } else {
                    found
                }
            })
    }
}

impl From<InstanceType> for &'static str {
    fn from(instance_type: InstanceType) -> Self {
        instance_type.as_str()
    }
}

impl TryFrom<String> for InstanceType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for InstanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| format!("unknown instance type '{s}'"))
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_known_type() {
        assert_eq!(InstanceType::lookup("t2.medium"), Some(InstanceType::T2Medium));
        assert_eq!(InstanceType::lookup("g4dn.2xlarge"), Some(InstanceType::G4dn_2Xlarge));
    }

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(InstanceType::lookup(""), None);
        assert_eq!(InstanceType::lookup("T2.MEDIUM"), None);
        assert_eq!(InstanceType::lookup(" t2.medium"), None);
        assert_eq!(InstanceType::lookup("t2.huge"), None);
    }

    #[test]
    fn test_every_type_round_trips_through_its_name() {
        for instance_type in InstanceType::ALL {
            assert_eq!(InstanceType::lookup(instance_type.as_str()), Some(*instance_type));
        }
    }

    #[test]
    fn test_common_families_are_recognized() {
        let rejected: Vec<&str> = [
            "t3a.nano",
            "t3a.small",
            "t3a.2xlarge",
            "m5a.large",
            "m5d.large",
            "c5.18xlarge",
            "r5.8xlarge",
            "i3.large",
            "x1e.32xlarge",
            "u-12tb1.metal",
        ]
        .into_iter()
        .filter(|name| InstanceType::lookup(name).is_none())
        .collect();

        assert!(rejected.is_empty(), "rejected: {rejected:?}");
        assert_eq!(InstanceType::lookup("c5.18xlarge"), Some(InstanceType::C5_18Xlarge));
        assert_eq!(InstanceType::lookup("u-12tb1.metal"), Some(InstanceType::U12tb1Metal));
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = InstanceType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names.len(), InstanceType::ALL.len());
    }

    #[test]
    fn test_serializes_as_aws_name() {
        let json = serde_json::to_string(&InstanceType::M5Large).unwrap();
        assert_eq!(json, "\"m5.large\"");

        let parsed: InstanceType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, InstanceType::M5Large);
        assert!(serde_json::from_str::<InstanceType>("\"m5.giant\"").is_err());
    }
}
