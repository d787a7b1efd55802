//! Access Path Model
//!
//! - `PathSegment`: one property read (or call) step
//! - `Path`: contiguous chain of segments between two call boundaries
//! - `PathGroup`: the full journey across call boundaries for one traversal
//!
//! Groups are plain values. The tracer clones a group before every
//! mutation, so a snapshot handed to the callback never changes afterward
//! and sibling branches never alias.
//!
//! @module trace/path

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

use super::types::Kind;
use crate::value::Value;

// =============================================================================
// PATH SEGMENT
// =============================================================================

/// One recorded property access or function call step
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    /// Property name that was read
    pub key: CompactString,
    /// Reflected type of the value the read produced
    pub kind: Kind,
    /// Arguments of the call; `Some` exactly when `kind` is `Function`
    pub call_args: Option<Vec<Value>>,
}

impl PathSegment {
    /// Segment for a property read producing a value of `kind`
    ///
    /// Function reads start with empty arguments until the call happens.
    pub fn access(key: impl Into<CompactString>, kind: Kind) -> Self {
        Self {
            key: key.into(),
            kind,
            call_args: (kind == Kind::Function).then(Vec::new),
        }
    }

    /// Segment for a function read that was invoked with `args`
    pub fn call(key: impl Into<CompactString>, args: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            kind: Kind::Function,
            call_args: Some(args),
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == Kind::Function
    }

    pub fn args(&self) -> &[Value] {
        self.call_args.as_deref().unwrap_or(&[])
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)?;
        if let Some(args) = &self.call_args {
            f.write_str("(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

// =============================================================================
// PATH
// =============================================================================

/// Chain of segments between two call boundaries
///
/// SmallVec<[_; 4]> because most chains are a handful of reads deep.
pub type Path = SmallVec<[PathSegment; 4]>;

// =============================================================================
// PATH GROUP
// =============================================================================

/// Ordered list of paths, one per hop across a call boundary
#[derive(Debug, Clone, PartialEq)]
pub struct PathGroup {
    paths: Vec<Path>,
}

impl PathGroup {
    /// A fresh group holding one empty, open path
    pub fn new() -> Self {
        Self {
            paths: vec![Path::new()],
        }
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The open path new segments are appended to
    pub fn last_path(&self) -> Option<&Path> {
        self.paths.last()
    }

    /// All paths before the open one
    ///
    /// This is what a boundary stop reports: the hops that finished before
    /// the current object was produced.
    pub fn completed(&self) -> PathGroup {
        let end = self.paths.len().saturating_sub(1);
        Self {
            paths: self.paths[..end].to_vec(),
        }
    }

    /// Copy of this group with `segment` appended to the open path
    pub fn with_segment(&self, segment: PathSegment) -> PathGroup {
        let mut group = self.clone();
        match group.paths.last_mut() {
            Some(path) => path.push(segment),
            None => group.paths.push(smallvec::smallvec![segment]),
        }
        group
    }

    /// Copy of this group marking a call boundary
    ///
    /// The trailing function segment receives `args` and a new, empty path
    /// is opened after it.
    pub fn with_call(&self, args: &[Value]) -> PathGroup {
        let mut group = self.clone();
        if let Some(segment) = group.paths.last_mut().and_then(|path| path.last_mut()) {
            segment.kind = Kind::Function;
            segment.call_args = Some(args.to_vec());
        }
        group.paths.push(Path::new());
        group
    }

    /// Total number of segments across all paths
    pub fn segment_count(&self) -> usize {
        self.paths.iter().map(|path| path.len()).sum()
    }

    /// Whether `other` starts with every path of this group, unchanged
    pub fn is_prefix_of(&self, other: &PathGroup) -> bool {
        other.paths.len() >= self.paths.len()
            && self.paths.iter().zip(&other.paths).all(|(a, b)| a == b)
    }
}

impl Default for PathGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Vec<PathSegment>>> for PathGroup {
    fn from(paths: Vec<Vec<PathSegment>>) -> Self {
        Self {
            paths: paths.into_iter().map(Path::from_vec).collect(),
        }
    }
}

impl fmt::Display for PathGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            for (j, segment) in path.iter().enumerate() {
                if j > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{}", segment)?;
            }
        }
        Ok(())
    }
}
