//! Sage reference scripts.
//!
//! The rendered script cross-validates a circuit by building the same ballot
//! with the sage library and emitting the witness input. Before the
//! toolchain runs, [`ScriptCache`] resolves every `sage_import` the script
//! makes and checks that the requested names exist, so a broken library
//! checkout fails fast instead of midway through a compile.

use crate::ballot::{capitalize_first, BallotType};
use crate::errors::{CircuitGenError, Result};
use crate::params::NamedParams;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Location of the sage library, relative to `sageTestFiles/`.
const SAGE_LIBRARY: &str = "../../../../../sage";

lazy_static! {
    static ref SAGE_IMPORT: Regex = Regex::new(
        r#"sage_import\(\s*['"]([^'"]+)['"]\s*(?:,\s*fromlist\s*=\s*\[([^\]]*)\])?"#
    )
    .unwrap();
    static ref QUOTED_NAME: Regex = Regex::new(r#"['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#).unwrap();
    // top level only: indented methods and locals are not module bindings
    static ref DEFINITION: Regex =
        Regex::new(r"(?m)^(?:(?:class|def)\s+([A-Za-z_][A-Za-z0-9_]*)|([A-Za-z_][A-Za-z0-9_]*)\s*=[^=])")
            .unwrap();
    static ref PYTHON_IMPORT: Regex =
        Regex::new(r"(?m)^(?:from\s+[\w.]+\s+import\s+([^#\n]+)|import\s+([^#\n]+))").unwrap();
}

/// One `sage_import(module, fromlist=[names])` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SageImport {
    pub module: String,
    pub names: Vec<String>,
}

/// Imports the reference script for `ballot_type` performs, in order.
pub fn reference_imports(ballot_type: BallotType) -> Vec<SageImport> {
    let import = |module: String, names: &[&str]| SageImport {
        module: format!("{}/{}", SAGE_LIBRARY, module),
        names: names.iter().map(|n| n.to_string()).collect(),
    };
    let ballot_class = format!("{}Ballot", ballot_type.pascal_name());
    vec![
        import("voting/ballot".to_string(), &["Ballot"]),
        import(format!("voting/{}", ballot_type), &[ballot_class.as_str()]),
        import("ellipticCurves/curve".to_string(), &["CurvePoint"]),
        import(
            "ellipticCurves/Montgomery".to_string(),
            &["MontgomeryAffinePoint", "MontgomeryProjectivePoint"],
        ),
        import("ellipticCurves/TwistedEdwards".to_string(), &["TwistedEdwardsPoint"]),
    ]
}

pub fn render_reference_script(
    ballot_type: BallotType,
    curve_name: &str,
    n_bits: u32,
    params: &NamedParams,
) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "from sageImport import sage_import")?;
    writeln!(out)?;
    for import in reference_imports(ballot_type) {
        let names = import.names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", ");
        writeln!(out, "sage_import('{}', fromlist=[{}])", import.module, names)?;
    }
    writeln!(out)?;
    let mut args = vec![
        format!("{}Ballot", ballot_type.pascal_name()),
        format!("{}Point", capitalize_first(curve_name)),
        n_bits.to_string(),
    ];
    if !params.is_empty() {
        args.push(params.join_assignments(", "));
    }
    writeln!(out, "Ballot.test({})", args.join(", "))?;
    Ok(out)
}

/// Render into `<dir>/<prefix>.sage`, creating `dir` if needed.
pub fn write_reference_script(
    dir: &Path,
    prefix: &str,
    ballot_type: BallotType,
    curve_name: &str,
    n_bits: u32,
    params: &NamedParams,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.sage", prefix));
    fs::write(&path, render_reference_script(ballot_type, curve_name, n_bits, params)?)?;
    log::info!("sage test file '{}' created", path.display());
    Ok(path)
}

/// Every `sage_import` call in `source`.
pub fn parse_imports(source: &str) -> Vec<SageImport> {
    SAGE_IMPORT
        .captures_iter(source)
        .map(|cap| SageImport {
            module: cap[1].to_string(),
            names: cap
                .get(2)
                .map(|list| {
                    QUOTED_NAME.captures_iter(list.as_str()).map(|n| n[1].to_string()).collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

/// Names bound by plain python `import` / `from ... import` lines, and
/// whether a `from ... import *` makes the namespace unknowable.
fn python_import_bindings(source: &str) -> (Vec<String>, bool) {
    let mut names = vec![];
    let mut star = false;
    for cap in PYTHON_IMPORT.captures_iter(source) {
        let (list, from) = match (cap.get(1), cap.get(2)) {
            (Some(list), _) => (list.as_str(), true),
            (None, Some(list)) => (list.as_str(), false),
            (None, None) => continue,
        };
        for item in list.trim().trim_start_matches('(').trim_end_matches(')').split(',') {
            let words: Vec<&str> = item.split_whitespace().collect();
            match words.as_slice() {
                ["*"] if from => star = true,
                [_, "as", alias] => names.push(alias.to_string()),
                [name] if from => names.push(name.to_string()),
                [dotted] => names.extend(dotted.split('.').next().map(str::to_string)),
                _ => {}
            }
        }
    }
    (names, star)
}

/// A loaded `.sage` file.
#[derive(Debug)]
pub struct SageModule {
    pub path: PathBuf,
    pub source: String,
    definitions: BTreeSet<String>,
    star_import: bool,
}

impl SageModule {
    /// Whether `name` is bound at the top level, either defined in the file
    /// or pulled in by one of its own imports. A module with a
    /// `from ... import *` is taken to bind anything.
    pub fn defines(&self, name: &str) -> bool {
        self.star_import || self.definitions.contains(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(String::as_str)
    }
}

/// Loaded sage modules keyed by canonical path.
///
/// Module names resolve like `sage_import` does: `<name>.sage` is looked up
/// in the importing file's directory first, then in each search root. Each
/// file is read once per cache lifetime; a module's nested imports are
/// resolved (and cached) when it is loaded.
///
/// Bindings are found by scanning lines, not by running sage: top-level
/// `class`/`def`/assignments, `import` and `from ... import` lines, and
/// `sage_import` calls. Names created dynamically (`load`, `exec`,
/// `globals()`) or in parenthesized imports spanning several lines are not
/// seen; `zkbench run --no-reference-check` skips the check for such a
/// library.
#[derive(Debug, Default)]
pub struct ScriptCache {
    search_roots: Vec<PathBuf>,
    modules: HashMap<PathBuf, Rc<SageModule>>,
    loading: HashSet<PathBuf>,
}

impl ScriptCache {
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        ScriptCache { search_roots, ..Default::default() }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn clear(&mut self) {
        self.modules.clear();
        self.loading.clear();
    }

    pub fn resolve(&self, module: &str, importer_dir: Option<&Path>) -> Result<PathBuf> {
        let filename = format!("{}.sage", module);
        let roots = importer_dir.into_iter().chain(self.search_roots.iter().map(PathBuf::as_path));
        for root in roots {
            let candidate = root.join(&filename);
            if candidate.is_file() {
                return Ok(fs::canonicalize(&candidate)?);
            }
        }
        Err(CircuitGenError::ModuleNotFound {
            module: filename,
            searched: self
                .search_roots
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into())
    }

    /// Load `module` and check that it binds every name in `names`.
    pub fn import(
        &mut self,
        module: &str,
        names: &[String],
        importer_dir: Option<&Path>,
    ) -> Result<Rc<SageModule>> {
        let path = self.resolve(module, importer_dir)?;
        let loaded = self.load(path)?;
        for name in names {
            if !loaded.defines(name) {
                return Err(CircuitGenError::MissingDefinition {
                    name: name.clone(),
                    module: loaded.path.display().to_string(),
                }
                .into());
            }
        }
        Ok(loaded)
    }

    /// Check every import of the script at `script` resolves.
    pub fn verify_script(&mut self, script: &Path) -> Result<()> {
        let source = fs::read_to_string(script)?;
        let dir = script.parent().map(Path::to_path_buf);
        for import in parse_imports(&source) {
            self.import(&import.module, &import.names, dir.as_deref())?;
        }
        log::debug!("reference imports of {} verified", script.display());
        Ok(())
    }

    fn load(&mut self, path: PathBuf) -> Result<Rc<SageModule>> {
        if let Some(module) = self.modules.get(&path) {
            return Ok(module.clone());
        }
        let source = fs::read_to_string(&path)?;
        let mut definitions: BTreeSet<String> = DEFINITION
            .captures_iter(&source)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
            .map(|m| m.as_str().to_string())
            .collect();
        let (imported, star_import) = python_import_bindings(&source);
        definitions.extend(imported);

        // import cycles terminate here; the partially loaded module binds nothing extra
        if self.loading.insert(path.clone()) {
            let dir = path.parent().map(Path::to_path_buf);
            let nested = parse_imports(&source);
            let result = nested.iter().try_for_each(|import| {
                self.import(&import.module, &import.names, dir.as_deref()).map(|_| ())
            });
            self.loading.remove(&path);
            result?;
            definitions.extend(nested.into_iter().flat_map(|import| import.names));
        }

        log::trace!("loaded sage module {}", path.display());
        let module = Rc::new(SageModule { path: path.clone(), source, definitions, star_import });
        self.modules.insert(path, module.clone());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Lay out `<root>/sage/...` and a test directory five levels below `root`.
    fn library(root: &Path, ballot: BallotType) -> PathBuf {
        let write = |rel: &str, body: &str| {
            let p = root.join("sage").join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, body).unwrap();
        };
        write("voting/ballot.sage", "class Ballot:\n    def test(cls): pass\n");
        write(
            &format!("voting/{}.sage", ballot),
            &format!(
                "sage_import('ballot', fromlist=['Ballot'])\nclass {}Ballot(Ballot):\n    pass\n",
                ballot.pascal_name()
            ),
        );
        write("ellipticCurves/curve.sage", "class CurvePoint:\n    pass\n");
        write(
            "ellipticCurves/Montgomery.sage",
            "sage_import('curve', fromlist=['CurvePoint'])\nclass MontgomeryAffinePoint(CurvePoint): pass\nMontgomeryProjectivePoint = MontgomeryAffinePoint\n",
        );
        write(
            "ellipticCurves/TwistedEdwards.sage",
            "sage_import('Montgomery', fromlist=['MontgomeryAffinePoint'])\nclass TwistedEdwardsPoint: pass\n",
        );
        let test_dir = root.join("benchmarks/groth16/twistedEdwards").join(ballot.name()).join("sageTestFiles");
        fs::create_dir_all(&test_dir).unwrap();
        test_dir
    }

    #[test]
    fn test_render_script() {
        let params = NamedParams::from_pairs([("nCand", "4"), ("nGrades", "5")]);
        let script = render_reference_script(BallotType::MajorityJudgement, "twistedEdwards", 16, &params).unwrap();
        assert!(script.contains(
            "sage_import('../../../../../sage/voting/majorityJudgement', fromlist=['MajorityJudgementBallot'])"
        ));
        assert!(script.ends_with(
            "Ballot.test(MajorityJudgementBallot, TwistedEdwardsPoint, 16, nCand=4, nGrades=5)\n"
        ));
    }

    #[test]
    fn test_parse_imports() {
        let imports = parse_imports("sage_import('a/b', fromlist=['X', \"Y\"])\nsage_import(\"c\")\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].module, "a/b");
        assert_eq!(imports[0].names, vec!["X", "Y"]);
        assert!(imports[1].names.is_empty());
    }

    #[test]
    fn test_verify_generated_script() {
        env_logger::try_init().unwrap_or_default();
        let root = tempdir().unwrap();
        let test_dir = library(root.path(), BallotType::SingleVote);
        let params = NamedParams::from_pairs([("nVotes", "3")]);
        let script =
            write_reference_script(&test_dir, "singleVote_nBits=8_nVotes=3", BallotType::SingleVote, "montgomery", 8, &params)
                .unwrap();

        let mut cache = ScriptCache::new(vec![]);
        cache.verify_script(&script).unwrap();
        // ballot, singleVote, curve, Montgomery, TwistedEdwards
        assert_eq!(cache.len(), 5);

        // a second pass is served from the cache
        cache.verify_script(&script).unwrap();
        assert_eq!(cache.len(), 5);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_nested_import_binds_names() {
        let root = tempdir().unwrap();
        library(root.path(), BallotType::Condorcet);
        let mut cache = ScriptCache::new(vec![root.path().join("sage/voting")]);
        let module = cache.import("condorcet", &["CondorcetBallot".to_string()], None).unwrap();
        assert!(module.defines("Ballot"));
        assert!(module.defines("CondorcetBallot"));
    }

    #[test]
    fn test_missing_module_and_name() {
        let root = tempdir().unwrap();
        library(root.path(), BallotType::LineVote);
        let mut cache = ScriptCache::new(vec![root.path().join("sage/ellipticCurves")]);

        let err = cache.import("Weierstrass", &[], None).unwrap_err();
        assert!(err.to_string().contains("Weierstrass.sage"), "{}", err);

        let err = cache.import("curve", &["EdwardsPoint".to_string()], None).unwrap_err();
        assert!(err.to_string().starts_with("cannot import name `EdwardsPoint`"), "{}", err);
    }

    #[test]
    fn test_python_imports_bind_names() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join("lib.sage"),
            "from sage.all import GF, Integer as ZZInt  # field helpers\n\
             import hashlib, os.path as osp\n\
             import itertools.chain\n\
             class Voting:\n    def helper(self): pass\n",
        )
        .unwrap();
        let mut cache = ScriptCache::new(vec![root.path().to_path_buf()]);
        let names = ["GF", "ZZInt", "hashlib", "osp", "itertools", "Voting"].map(String::from);
        cache.import("lib", &names, None).unwrap();

        for missing in ["helper", "Integer", "os"] {
            let err = cache.import("lib", &[missing.to_string()], None).unwrap_err();
            assert!(err.to_string().starts_with(&format!("cannot import name `{}`", missing)), "{}", err);
        }
    }

    #[test]
    fn test_star_import_binds_anything() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("all.sage"), "from sage.all import *\n").unwrap();
        let mut cache = ScriptCache::new(vec![root.path().to_path_buf()]);
        assert!(cache.import("all", &["EllipticCurve".to_string()], None).unwrap().defines("GF"));
    }

    #[test]
    fn test_import_cycle_terminates() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.sage"), "sage_import('b', fromlist=['B'])\nA = 1\n").unwrap();
        fs::write(root.path().join("b.sage"), "sage_import('a')\nB = 2\n").unwrap();
        let mut cache = ScriptCache::new(vec![root.path().to_path_buf()]);
        let a = cache.import("a", &["A".to_string(), "B".to_string()], None).unwrap();
        assert!(a.definitions().any(|d| d == "B"));
        assert_eq!(cache.len(), 2);
    }
}
