//! Reading guides and timeline parameters out of a Kdenlive project.
//!
//! Kdenlive saves projects as MLT XML. The parts used here look like:
//!
//! ```xml
//! <mlt>
//!   <profile frame_rate_num="25" frame_rate_den="1" ... />
//!   <producer id="black_track">
//!     <property name="length">1000</property>
//!   </producer>
//!   <playlist id="main_bin">
//!     <property name="kdenlive:docproperties.guides">[{"comment":"Intro","pos":0,"type":0}]</property>
//!   </playlist>
//! </mlt>
//! ```

use std::path::Path;

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const PROFILE_TAG: &str = "profile";
const FRAME_RATE_NUM_ATTR: &str = "frame_rate_num";
const FRAME_RATE_DEN_ATTR: &str = "frame_rate_den";

const BLACK_TRACK_ID: &str = "black_track";
const LENGTH_PROPERTY: &str = "length";

const MAIN_BIN_ID: &str = "main_bin";
const GUIDES_PROPERTY: &str = "kdenlive:docproperties.guides";

/// Frame positions and counts must fit in signed tick arithmetic.
const MAX_FRAME: u64 = i64::MAX as u64;

/// A named guide at a frame position.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Guide {
    #[serde(rename = "pos")]
    pub position: u64,

    #[serde(rename = "comment")]
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timeline {
    /// Frames per second, rounded to two decimals.
    pub frame_rate: f64,
    pub total_frames: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub timeline: Timeline,
    /// Sorted by position.
    pub guides: Vec<Guide>,
}

pub fn read_project(path: impl AsRef<Path>) -> Result<Project, ParseError> {
    let xml = std::fs::read_to_string(path.as_ref()).map_err(|source| ParseError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    parse_project(&xml)
}

pub fn parse_project(xml: &str) -> Result<Project, ParseError> {
    let doc = Document::parse(xml)?;

    let frame_rate = read_frame_rate(&doc)?;
    let total_frames = read_total_frames(&doc)?;
    let guides = read_guides(&doc)?;

    log::debug!(
        "Project: {} fps, {} frames, {} guides",
        frame_rate,
        total_frames,
        guides.len()
    );

    Ok(Project {
        timeline: Timeline {
            frame_rate,
            total_frames,
        },
        guides,
    })
}

fn read_frame_rate(doc: &Document) -> Result<f64, ParseError> {
    let profile = doc
        .descendants()
        .find(|n| n.has_tag_name(PROFILE_TAG))
        .ok_or(ParseError::MissingNode("<profile> element"))?;

    let numerator = parse_attribute(&profile, FRAME_RATE_NUM_ATTR, "frame rate numerator")?;
    let denominator = parse_attribute(&profile, FRAME_RATE_DEN_ATTR, "frame rate denominator")?;
    if denominator == 0 {
        return Err(ParseError::ZeroDenominator);
    }

    let frame_rate = round_to_hundredths(numerator as f64 / denominator as f64);
    if frame_rate <= 0.0 {
        return Err(ParseError::InvalidValue {
            what: "frame rate",
            value: format!("{numerator}/{denominator}"),
        });
    }

    Ok(frame_rate)
}

fn read_total_frames(doc: &Document) -> Result<u64, ParseError> {
    let black_track = find_by_id(doc, "producer", BLACK_TRACK_ID)
        .ok_or(ParseError::MissingNode("black_track producer"))?;
    let length = property(&black_track, LENGTH_PROPERTY)
        .ok_or(ParseError::MissingNode("black_track length property"))?;

    let text = length.text().unwrap_or_default().trim();
    match text.parse::<u64>() {
        Ok(frames) if frames > 0 && frames <= MAX_FRAME => Ok(frames),
        _ => Err(ParseError::InvalidValue {
            what: "total frame count",
            value: text.to_owned(),
        }),
    }
}

fn read_guides(doc: &Document) -> Result<Vec<Guide>, ParseError> {
    let main_bin = find_by_id(doc, "playlist", MAIN_BIN_ID)
        .ok_or(ParseError::MissingNode("main_bin playlist"))?;
    let guides = property(&main_bin, GUIDES_PROPERTY)
        .ok_or(ParseError::MissingNode("guides property"))?;

    let text = guides.text().unwrap_or_default().trim();
    parse_guides(text)
}

/// Decodes the JSON guide list and sorts it by position.
///
/// Equal positions keep their order from the project file.
pub fn parse_guides(json: &str) -> Result<Vec<Guide>, ParseError> {
    if json.is_empty() {
        return Ok(Vec::new());
    }

    let mut guides: Vec<Guide> = serde_json::from_str(json)?;
    if let Some(guide) = guides.iter().find(|guide| guide.position > MAX_FRAME) {
        return Err(ParseError::InvalidValue {
            what: "guide position",
            value: guide.position.to_string(),
        });
    }
    guides.sort_by_key(|guide| guide.position);
    Ok(guides)
}

fn parse_attribute(node: &Node, name: &str, what: &'static str) -> Result<u64, ParseError> {
    let value = node
        .attribute(name)
        .ok_or(ParseError::MissingNode("frame rate attribute on <profile>"))?;

    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidValue {
            what,
            value: value.to_owned(),
        })
}

fn find_by_id<'a, 'input>(
    doc: &'a Document<'input>,
    tag: &str,
    id: &str,
) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.has_tag_name(tag) && n.attribute("id") == Some(id))
}

fn property<'a, 'input>(parent: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| n.has_tag_name("property") && n.attribute("name") == Some(name))
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
