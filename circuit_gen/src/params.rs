use crate::errors::{CircuitGenError, Result};
use std::fmt;

/// Declares a fieldless enum whose variants map one-to-one onto the
/// identifiers used on the command line and in the JSON configs.
macro_rules! named_variants {
    ($(#[$meta:meta])* $vis:vis enum $name:ident : $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::CircuitGenError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $name::ALL.iter().copied().find(|v| v.name() == s).ok_or_else(|| {
                    $crate::errors::CircuitGenError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: $name::ALL.iter().map(|v| v.name()).collect::<Vec<_>>().join(", "),
                    }
                })
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}
pub(crate) use named_variants;

named_variants! {
    /// SNARK backend driven through snarkjs.
    pub enum ProofSystem: "proof system" {
        Groth16 => "groth16",
        Plonk => "plonk",
        Fflonk => "fflonk",
    }
}

impl ProofSystem {
    /// circom simplification level passed to the compile script.
    pub fn optimization_level(&self) -> u8 {
        match self {
            ProofSystem::Groth16 => 2,
            ProofSystem::Plonk | ProofSystem::Fflonk => 1,
        }
    }
}

named_variants! {
    /// Which assertions the generated circuit contains.
    pub enum Mode: "mode" {
        Voting => "voting",
        Encryption => "encryption",
        Combined => "combined",
    }
}

impl Mode {
    pub fn includes_encryption(&self) -> bool {
        matches!(self, Mode::Encryption | Mode::Combined)
    }

    pub fn includes_voting(&self) -> bool {
        matches!(self, Mode::Voting | Mode::Combined)
    }
}

/// Curve whose plaintexts are encoded in base-5 digits instead of bits.
pub const TWISTED_EDWARDS: &str = "twistedEdwards";
pub const TE_ENC_BASE: f64 = 5.0;
pub const BITS_RAND: u32 = 255;

/// Number of encoding digits needed for `bits` bits on `curve`.
pub fn digits_for(curve: &str, bits: u32) -> u32 {
    if curve == TWISTED_EDWARDS {
        (bits as f64 / TE_ENC_BASE.log2()).ceil() as u32
    } else {
        bits
    }
}

/// Ordered `key=value` parameters of one benchmark, in command-line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedParams(Vec<(String, String)>);

impl NamedParams {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some((k, v)) if !k.is_empty() => params.push((k.to_string(), v.to_string())),
                _ => return Err(CircuitGenError::InvalidNamedParam(arg.to_string()).into()),
            }
        }
        Ok(NamedParams(params))
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        NamedParams(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.iter().map(|(_, v)| v).collect()
    }

    /// `k1=v1<sep>k2=v2...`
    pub fn join_assignments(&self, sep: &str) -> String {
        self.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(sep)
    }
}

impl fmt::Display for NamedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join_assignments(" "))
    }
}
