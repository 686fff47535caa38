use super::{ParsePath, PathElement};
use std::fmt::{self, Write as _};

/// Shared head and tail of a set of paths, plus what lies between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commonalities {
    pub head: Vec<PathElement>,
    /// One entry per input path, in input order
    pub middles: Vec<Vec<PathElement>>,
    pub tail: Vec<PathElement>,
}

impl Commonalities {
    /// Reassemble input path `index`
    #[must_use]
    pub fn path(&self, index: usize) -> Option<ParsePath> {
        let middle = self.middles.get(index)?;
        Some(
            self.head
                .iter()
                .chain(middle)
                .chain(&self.tail)
                .cloned()
                .collect(),
        )
    }
}

/// Longest common prefix and suffix of `paths`.
///
/// The suffix never overlaps the prefix, so
/// `head ++ middles[i] ++ tail == paths[i]` for every `i`.
#[must_use]
pub fn commonalities(paths: &[ParsePath]) -> Commonalities {
    let Some(shortest) = paths.iter().map(ParsePath::len).min() else {
        return Commonalities::default();
    };
    let first = paths[0].elements();

    let head_len = (0..shortest)
        .take_while(|&i| paths.iter().all(|p| p.elements()[i] == first[i]))
        .count();
    let tail_len = (0..shortest - head_len)
        .take_while(|&k| {
            let expected = &first[first.len() - 1 - k];
            paths
                .iter()
                .all(|p| &p.elements()[p.len() - 1 - k] == expected)
        })
        .count();

    Commonalities {
        head: first[..head_len].to_vec(),
        middles: paths
            .iter()
            .map(|p| p.elements()[head_len..p.len() - tail_len].to_vec())
            .collect(),
        tail: first[first.len() - tail_len..].to_vec(),
    }
}

/// Piece of a recursive split layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Elements shared by every path of the enclosing branch
    Common(Vec<PathElement>),
    /// Paths part ways; each branch groups paths whose next element agrees
    Fork(Vec<Branch>),
}

/// Paths of one side of a [`Segment::Fork`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Indices of the input paths in this branch
    pub members: Vec<usize>,
    pub segments: Vec<Segment>,
}

/// Recursive head/tail layout of `paths`: the common head, then a fork on the
/// first element of each middle with every cluster split again, then the
/// common tail.
#[must_use]
pub fn split(paths: &[ParsePath]) -> Vec<Segment> {
    let members: Vec<usize> = (0..paths.len()).collect();
    split_members(paths, &members)
}

fn split_members(all: &[ParsePath], members: &[usize]) -> Vec<Segment> {
    let paths: Vec<ParsePath> = members.iter().map(|&i| all[i].clone()).collect();
    let common = commonalities(&paths);
    let mut segments = Vec::new();
    if !common.head.is_empty() {
        segments.push(Segment::Common(common.head.clone()));
    }

    if common.middles.iter().any(|m| !m.is_empty()) {
        let mut clusters: Vec<(Option<&PathElement>, Vec<usize>)> = Vec::new();
        for (position, middle) in common.middles.iter().enumerate() {
            let key = middle.first();
            match clusters.iter_mut().find(|(k, _)| *k == key) {
                Some((_, cluster)) => cluster.push(position),
                None => clusters.push((key, vec![position])),
            }
        }
        let middles: Vec<ParsePath> = common
            .middles
            .iter()
            .map(|m| ParsePath::new(m.clone()))
            .collect();
        let branches = clusters
            .into_iter()
            .map(|(_, cluster)| Branch {
                members: cluster.iter().map(|&p| members[p]).collect(),
                segments: split_members(&middles, &cluster),
            })
            .collect();
        segments.push(Segment::Fork(branches));
    }

    if !common.tail.is_empty() {
        segments.push(Segment::Common(common.tail));
    }
    segments
}

/// Indented text rendering of a split layout
#[must_use]
pub fn render_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    write_segments(&mut out, segments, 0);
    out
}

fn write_segments(out: &mut String, segments: &[Segment], depth: usize) {
    let indent = "  ".repeat(depth);
    for segment in segments {
        match segment {
            Segment::Common(elements) => {
                let labels: Vec<String> = elements.iter().map(ToString::to_string).collect();
                let _ = writeln!(out, "{indent}{}", labels.join(" "));
            }
            Segment::Fork(branches) => {
                for branch in branches {
                    let _ = writeln!(out, "{indent}| paths {:?}", branch.members);
                    write_segments(out, &branch.segments, depth + 1);
                }
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(render_segments(std::slice::from_ref(self)).trim_end())
    }
}
