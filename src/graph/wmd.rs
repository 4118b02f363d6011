//! WMD record schema: the typed vertex/edge payloads the ingestion pipeline parses rows into.
//!
//! Record rows are comma-separated, `TYPE` first: `Person,id,...` for vertices, `Sale,src,dst,...`
//! for edges. Column position within a row determines which field carries the id/src/dst, and
//! varies by `TYPE` (an `Author` edge's destination sits in whichever of forum/forum-event/
//! publication columns is non-empty, for instance) — this mirrors how the same record format is
//! shared across five unrelated vertex kinds and five unrelated edge kinds.

use crate::error::{Result, Status};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Person,
    ForumEvent,
    Forum,
    Publication,
    Topic,
    /// Synthesized by the edge-list ingestion variant, which has no vertex records at all.
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Sale,
    Author,
    Includes,
    HasTopic,
    HasOrg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WmdVertex {
    pub token: u64,
    pub kind: VertexKind,
}

impl WmdVertex {
    pub fn new(token: u64, kind: VertexKind) -> Self {
        Self { token, kind }
    }

    /// Synthesizes a typeless vertex for a token seen only as an edge endpoint (edge-list variant).
    pub fn synthesize(token: u64) -> Self {
        Self::new(token, VertexKind::None)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WmdEdge {
    pub src: u64,
    pub dst: u64,
    pub kind: EdgeKind,
    pub src_kind: VertexKind,
    pub dst_kind: VertexKind,
}

/// Strips `//`, `#` line comments and `/*...*/` block comments, trimming whitespace. Returns
/// `None` for a line that is blank once comments are stripped.
pub fn strip_comment(line: &str) -> Option<&str> {
    let mut end = line.len();
    if let Some(idx) = line.find("//") {
        end = end.min(idx);
    }
    if let Some(idx) = line.find('#') {
        end = end.min(idx);
    }
    if let Some(idx) = line.find("/*") {
        end = end.min(idx);
    }
    let stripped = line[..end].trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Parses one comma-separated record row into either a vertex or an edge, per the column layout
/// of its `TYPE` header. Columns beyond what a given `TYPE` needs are ignored, matching the shared
/// six-column record layout the format reuses across all ten record kinds.
pub fn parse_record_row(line: &str) -> Result<RecordRow> {
    let Some(row) = strip_comment(line) else {
        return Ok(RecordRow::Blank);
    };
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.is_empty() {
        return Ok(RecordRow::Blank);
    }

    let field = |i: usize| -> &str { fields.get(i).copied().unwrap_or("") };
    let parse_u64 = |s: &str| -> Result<u64> {
        s.parse::<u64>()
            .map_err(|_| Status::Error(format!("record field {s:?} is not a valid token id")))
    };

    match fields[0] {
        "Person" => Ok(RecordRow::Vertex(WmdVertex::new(parse_u64(field(1))?, VertexKind::Person))),
        "ForumEvent" => Ok(RecordRow::Vertex(WmdVertex::new(parse_u64(field(4))?, VertexKind::ForumEvent))),
        "Forum" => Ok(RecordRow::Vertex(WmdVertex::new(parse_u64(field(3))?, VertexKind::Forum))),
        "Publication" => Ok(RecordRow::Vertex(WmdVertex::new(parse_u64(field(5))?, VertexKind::Publication))),
        "Topic" => Ok(RecordRow::Vertex(WmdVertex::new(parse_u64(field(6))?, VertexKind::Topic))),

        "Sale" => Ok(RecordRow::Edge(WmdEdge {
            src: parse_u64(field(1))?,
            dst: parse_u64(field(2))?,
            kind: EdgeKind::Sale,
            src_kind: VertexKind::Person,
            dst_kind: VertexKind::Person,
        })),
        "Author" => {
            let (dst, dst_kind) = if !field(3).is_empty() {
                (parse_u64(field(3))?, VertexKind::Forum)
            } else if !field(4).is_empty() {
                (parse_u64(field(4))?, VertexKind::ForumEvent)
            } else {
                (parse_u64(field(5))?, VertexKind::Publication)
            };
            Ok(RecordRow::Edge(WmdEdge {
                src: parse_u64(field(1))?,
                dst,
                kind: EdgeKind::Author,
                src_kind: VertexKind::Person,
                dst_kind,
            }))
        }
        "Includes" => Ok(RecordRow::Edge(WmdEdge {
            src: parse_u64(field(3))?,
            dst: parse_u64(field(4))?,
            kind: EdgeKind::Includes,
            src_kind: VertexKind::Forum,
            dst_kind: VertexKind::ForumEvent,
        })),
        "HasTopic" => {
            let (src, src_kind) = if !field(3).is_empty() {
                (parse_u64(field(3))?, VertexKind::Forum)
            } else if !field(4).is_empty() {
                (parse_u64(field(4))?, VertexKind::ForumEvent)
            } else {
                (parse_u64(field(5))?, VertexKind::Publication)
            };
            Ok(RecordRow::Edge(WmdEdge {
                src,
                dst: parse_u64(field(6))?,
                kind: EdgeKind::HasTopic,
                src_kind,
                dst_kind: VertexKind::Topic,
            }))
        }
        "HasOrg" => Ok(RecordRow::Edge(WmdEdge {
            src: parse_u64(field(5))?,
            dst: parse_u64(field(6))?,
            kind: EdgeKind::HasOrg,
            src_kind: VertexKind::Publication,
            dst_kind: VertexKind::Topic,
        })),
        other => Err(Status::Error(format!("unrecognized record type {other:?}"))),
    }
}

/// Parses one whitespace-separated `src dst` line of the edge-list variant.
pub fn parse_edge_list_row(line: &str) -> Result<Option<(u64, u64)>> {
    let Some(row) = strip_comment(line) else {
        return Ok(None);
    };
    let mut fields = row.split_whitespace();
    let src = fields
        .next()
        .ok_or_else(|| Status::Error("edge-list row missing source token".to_string()))?;
    let dst = fields
        .next()
        .ok_or_else(|| Status::Error("edge-list row missing destination token".to_string()))?;
    let src = src.parse::<u64>().map_err(|_| Status::Error(format!("{src:?} is not a valid token id")))?;
    let dst = dst.parse::<u64>().map_err(|_| Status::Error(format!("{dst:?} is not a valid token id")))?;
    Ok(Some((src, dst)))
}

pub enum RecordRow {
    Vertex(WmdVertex),
    Edge(WmdEdge),
    Blank,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Person,1,,,,,", 1, VertexKind::Person; "person")]
    #[test_case("ForumEvent,,,,2,,", 2, VertexKind::ForumEvent; "forum event")]
    #[test_case("Forum,,,3,,,", 3, VertexKind::Forum; "forum")]
    #[test_case("Publication,,,,,4,", 4, VertexKind::Publication; "publication")]
    #[test_case("Topic,,,,,,5", 5, VertexKind::Topic; "topic")]
    fn parses_each_vertex_kind_at_its_record_column(row: &str, expected_token: u64, expected_kind: VertexKind) {
        match parse_record_row(row).unwrap() {
            RecordRow::Vertex(v) => {
                assert_eq!(v.token, expected_token);
                assert_eq!(v.kind, expected_kind);
            }
            _ => panic!("expected a vertex row"),
        }
    }

    #[test]
    fn strips_line_and_block_comments() {
        assert_eq!(strip_comment("Person,1,,,,,  // a customer"), Some("Person,1,,,,,"));
        assert_eq!(strip_comment("# just a comment"), None);
        assert_eq!(strip_comment("  "), None);
        assert_eq!(strip_comment("Sale,1,2,,,, /* note */"), Some("Sale,1,2,,,,"));
    }

    #[test]
    fn parses_person_vertex() {
        match parse_record_row("Person,42,,,,,").unwrap() {
            RecordRow::Vertex(v) => {
                assert_eq!(v.token, 42);
                assert_eq!(v.kind, VertexKind::Person);
            }
            _ => panic!("expected a vertex row"),
        }
    }

    #[test]
    fn parses_sale_edge() {
        match parse_record_row("Sale,1,2,,,,").unwrap() {
            RecordRow::Edge(e) => {
                assert_eq!((e.src, e.dst), (1, 2));
                assert_eq!(e.kind, EdgeKind::Sale);
                assert_eq!((e.src_kind, e.dst_kind), (VertexKind::Person, VertexKind::Person));
            }
            _ => panic!("expected an edge row"),
        }
    }

    #[test]
    fn parses_author_edge_with_forum_event_destination() {
        // tokens: TYPE,src,_,forum,forumEvent,publication
        match parse_record_row("Author,7,,,9,").unwrap() {
            RecordRow::Edge(e) => {
                assert_eq!((e.src, e.dst), (7, 9));
                assert_eq!(e.dst_kind, VertexKind::ForumEvent);
            }
            _ => panic!("expected an edge row"),
        }
    }

    #[test]
    fn parses_edge_list_row() {
        assert_eq!(parse_edge_list_row("3 4").unwrap(), Some((3, 4)));
        assert_eq!(parse_edge_list_row("# comment").unwrap(), None);
        assert!(parse_edge_list_row("3").is_err());
    }
}
