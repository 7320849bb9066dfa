use crate::error::Error;
use crate::store::StorePath;
use crate::types::{EqClass, Out};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

pub const DRV_EXT: &str = ".drv";

/// Separator between a derivation path and its requested output slots.
pub const OUT_SEP: char = '!';

pub fn is_derivation(p: &StorePath) -> bool {
    p.name_part().ends_with(DRV_EXT)
}

/// A single declared output slot of a derivation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DrvOutput {
    pub path: StorePath,
    pub eq_class: EqClass,
}

/// A build recipe as stored on disk.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Derivation {
    pub outputs: BTreeMap<Out, DrvOutput>,
    pub input_srcs: BTreeSet<StorePath>,
    pub input_drvs: BTreeMap<StorePath, BTreeSet<Out>>,
    pub system: String,
    pub builder: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
}

/// The equivalence class of a named output slot.
pub fn output_eq_class(drv: &Derivation, out: &str) -> Result<EqClass, Error> {
    drv.outputs
        .get(out)
        .map(|o| o.eq_class.clone())
        .ok_or_else(|| Error::NoSuchOutput(out.to_string()))
}

/// Derivations that ask for a local build are never substituted.
pub fn must_build_locally(drv: &Derivation) -> bool {
    drv.envs
        .get("preferLocalBuild")
        .is_some_and(|v| v == "1" || v == "true")
}

/// Whether the slot `out` is selected by the request list `wanted`.
/// An empty list selects every output.
pub fn want_output(out: &str, wanted: &[Out]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| w == out)
}

/// A planner target: either a plain path (no outputs) or a derivation
/// with a selection of output slots, written `<path>!out1,out2`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrvPathWithOutputs {
    pub path: StorePath,
    pub outputs: Vec<Out>,
}

impl DrvPathWithOutputs {
    pub fn plain(path: StorePath) -> Self {
        Self {
            path,
            outputs: Vec::new(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let (path, outs) = match s.split_once(OUT_SEP) {
            Some((path, outs)) => (path, Some(outs)),
            None => (s, None),
        };
        let path = StorePath::parse(path)?;
        let outputs = match outs {
            None => Vec::new(),
            Some(outs) => {
                let outputs: Vec<Out> = outs.split(',').map(|o| o.to_string()).collect();
                if outputs.iter().any(|o| o.is_empty()) {
                    return Err(Error::InvalidDrvPath(s.to_string()));
                }
                outputs
            }
        };
        Ok(Self { path, outputs })
    }
}

impl Display for DrvPathWithOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)?;
        if !self.outputs.is_empty() {
            write!(f, "{}{}", OUT_SEP, self.outputs.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::store::PathHash;

    fn path(seed: u8, name: &str) -> StorePath {
        StorePath::new(&PathHash::from_hash(&Hash::Sha256([seed; 32])), name)
    }

    #[test]
    fn derivation_suffix() {
        assert!(is_derivation(&path(1, "hello-1.0.drv")));
        assert!(!is_derivation(&path(1, "hello-1.0")));
    }

    #[test]
    fn parse_plain_path() {
        let p = path(2, "hello");
        let t = DrvPathWithOutputs::parse(&p).unwrap();
        assert_eq!(t.path, p);
        assert!(t.outputs.is_empty());
        assert_eq!(t.to_string(), p.to_string());
    }

    #[test]
    fn parse_with_outputs() {
        let p = path(3, "hello.drv");
        let s = format!("{p}!out,dev");
        let t = DrvPathWithOutputs::parse(&s).unwrap();
        assert_eq!(t.outputs, vec!["out".to_string(), "dev".to_string()]);
        assert_eq!(t.to_string(), s);
    }

    #[test]
    fn parse_rejects_empty_output() {
        let p = path(4, "hello.drv");
        assert!(DrvPathWithOutputs::parse(&format!("{p}!out,,dev")).is_err());
        assert!(DrvPathWithOutputs::parse("bogus!out").is_err());
    }

    #[test]
    fn output_eq_class_by_slot() {
        let out = path(5, "hello");
        let cls = path(6, "hello.out");
        let drv = Derivation {
            outputs: [(
                "out".to_string(),
                DrvOutput {
                    path: out,
                    eq_class: cls.clone(),
                },
            )]
            .into(),
            input_srcs: BTreeSet::new(),
            input_drvs: BTreeMap::new(),
            system: "x86_64-linux".to_string(),
            builder: "/bin/sh".to_string(),
            args: Vec::new(),
            envs: BTreeMap::new(),
        };
        assert_eq!(output_eq_class(&drv, "out").unwrap(), cls);
        assert!(matches!(
            output_eq_class(&drv, "dev"),
            Err(Error::NoSuchOutput(_))
        ));
    }

    #[test]
    fn want_output_empty_selects_all() {
        assert!(want_output("out", &[]));
        assert!(want_output("dev", &["dev".to_string()]));
        assert!(!want_output("out", &["dev".to_string()]));
    }
}
