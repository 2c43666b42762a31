use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Kawaii,
    Flat,
    Watercolor,
    Chalkboard,
    #[serde(rename = "3d")]
    ThreeD,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Kawaii => "kawaii",
            Style::Flat => "flat",
            Style::Watercolor => "watercolor",
            Style::Chalkboard => "chalkboard",
            Style::ThreeD => "3d",
        }
    }

    /// Prompt fragment describing the visual style.
    pub fn description(&self) -> &'static str {
        match self {
            Style::Kawaii => "Kawaii flat cartoon style with cute characters and bright pastel colors",
            Style::Flat => "Clean flat minimalist design with simple shapes and modern typography",
            Style::Watercolor => "Artistic watercolor painting style with soft flowing paint effects",
            Style::Chalkboard => {
                "Chalk on blackboard style with white chalk drawings on dark background"
            }
            Style::ThreeD => {
                "Three-dimensional rendered style with depth, shadows and realistic textures"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "4:3")]
    Landscape,
    #[default]
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Tall => "9:16",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Wide => "16:9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Chinese,
    Japanese,
    Spanish,
    French,
    German,
    Korean,
    Portuguese,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Chinese => "chinese",
            Language::Japanese => "japanese",
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
            Language::Korean => "korean",
            Language::Portuguese => "portuguese",
        }
    }
}

/// A style, ratio or language label that is not offered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported {kind}: {value}")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

fn parse_label<T: Copy>(
    kind: &'static str,
    all: &[T],
    label: fn(&T) -> &'static str,
    s: &str,
) -> Result<T, UnknownOption> {
    let wanted = s.trim().to_lowercase();
    all.iter()
        .copied()
        .find(|v| label(v) == wanted)
        .ok_or_else(|| UnknownOption {
            kind,
            value: s.to_string(),
        })
}

impl Style {
    pub const ALL: [Style; 5] = [
        Style::Kawaii,
        Style::Flat,
        Style::Watercolor,
        Style::Chalkboard,
        Style::ThreeD,
    ];
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Tall,
        AspectRatio::Landscape,
        AspectRatio::Wide,
    ];
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Chinese,
        Language::Japanese,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Korean,
        Language::Portuguese,
    ];
}

impl FromStr for Style {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("style", &Style::ALL, Style::as_str, s)
    }
}

impl FromStr for AspectRatio {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("ratio", &AspectRatio::ALL, AspectRatio::as_str, s)
    }
}

impl FromStr for Language {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label("language", &Language::ALL, Language::as_str, s)
    }
}
