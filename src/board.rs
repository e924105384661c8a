use std::fmt;
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MIC_710AI_INPUT: [u32; 4] = [200, 38, 62, 194];
const MIC_710AI_OUTPUT: [u32; 4] = [63, 149, 66, 168];

const MIC_730AI_INPUT: [u32; 8] = [232, 233, 234, 235, 236, 237, 238, 239];
const MIC_730AI_OUTPUT: [u32; 8] = [224, 225, 226, 227, 228, 229, 230, 231];

// MIC-710IVA shares the same lines as MIC-710AIX
const MIC_710AIX_INPUT: [u32; 4] = [422, 393, 419, 268];
const MIC_710AIX_OUTPUT: [u32; 4] = [266, 421, 264, 424];

const MIC_730IVA_INPUT: [u32; 4] = [240, 241, 242, 243];
const MIC_730IVA_OUTPUT: [u32; 4] = [232, 233, 234, 235];

#[derive(Debug, Hash, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum BoardModel {
    #[serde(rename = "MIC-710AI")]
    Mic710Ai,
    #[serde(rename = "MIC-730AI")]
    Mic730Ai,
    #[serde(rename = "MIC-710AIX")]
    Mic710Aix,
    #[serde(rename = "MIC-710IVA")]
    Mic710Iva,
    #[serde(rename = "MIC-730IVA")]
    Mic730Iva,
}

/// Input and output line numbers for one board model, in slot order. Slot
/// index `i` denotes the same physical line for the lifetime of a controller.
#[derive(Debug, Clone, Copy)]
pub struct PinMap {
    pub inputs: &'static [u32],
    pub outputs: &'static [u32],
}

impl BoardModel {
    pub const ALL: [BoardModel; 5] = [
        BoardModel::Mic710Ai,
        BoardModel::Mic730Ai,
        BoardModel::Mic710Aix,
        BoardModel::Mic710Iva,
        BoardModel::Mic730Iva,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MIC-710AI" => Some(BoardModel::Mic710Ai),
            "MIC-730AI" => Some(BoardModel::Mic730Ai),
            "MIC-710AIX" => Some(BoardModel::Mic710Aix),
            "MIC-710IVA" => Some(BoardModel::Mic710Iva),
            "MIC-730IVA" => Some(BoardModel::Mic730Iva),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoardModel::Mic710Ai => "MIC-710AI",
            BoardModel::Mic730Ai => "MIC-730AI",
            BoardModel::Mic710Aix => "MIC-710AIX",
            BoardModel::Mic710Iva => "MIC-710IVA",
            BoardModel::Mic730Iva => "MIC-730IVA",
        }
    }

    pub fn pin_map(&self) -> PinMap {
        match self {
            BoardModel::Mic710Ai => PinMap {
                inputs: &MIC_710AI_INPUT,
                outputs: &MIC_710AI_OUTPUT,
            },
            BoardModel::Mic730Ai => PinMap {
                inputs: &MIC_730AI_INPUT,
                outputs: &MIC_730AI_OUTPUT,
            },
            BoardModel::Mic710Aix | BoardModel::Mic710Iva => PinMap {
                inputs: &MIC_710AIX_INPUT,
                outputs: &MIC_710AIX_OUTPUT,
            },
            BoardModel::Mic730Iva => PinMap {
                inputs: &MIC_730IVA_INPUT,
                outputs: &MIC_730IVA_OUTPUT,
            },
        }
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Model and BSP build identifier reported by the provisioning descriptor
/// file, read once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDescriptor {
    pub model: BoardModel,
    pub bsp: String,
}

impl BoardDescriptor {
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read descriptor {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::parse(&contents)
    }

    /// Both fields are cut from the same raw text: model before the first
    /// `_`, BSP before the first `,`. A missing delimiter yields the whole
    /// string as that field.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let model_token = match raw.split_once('_') {
            Some((token, _)) => token,
            None => raw,
        };
        let bsp = match raw.split_once(',') {
            Some((token, _)) => token,
            None => raw,
        };
        let model = BoardModel::from_token(model_token)
            .ok_or_else(|| AppError::UnknownModel(model_token.to_string()))?;
        Ok(Self {
            model,
            bsp: bsp.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn pin_maps_have_fixture_lengths() {
        for (model, inputs, outputs) in [
            (BoardModel::Mic710Ai, 4, 4),
            (BoardModel::Mic730Ai, 8, 8),
            (BoardModel::Mic710Aix, 4, 4),
            (BoardModel::Mic710Iva, 4, 4),
            (BoardModel::Mic730Iva, 4, 4),
        ] {
            let map = model.pin_map();
            assert_eq!(map.inputs.len(), inputs, "{model} inputs");
            assert_eq!(map.outputs.len(), outputs, "{model} outputs");
        }
    }

    #[test]
    fn pin_numbers_are_distinct_within_a_model() {
        for model in BoardModel::ALL {
            let map = model.pin_map();
            let combined: HashSet<u32> = map
                .inputs
                .iter()
                .chain(map.outputs.iter())
                .copied()
                .collect();
            assert_eq!(
                combined.len(),
                map.inputs.len() + map.outputs.len(),
                "duplicate line number in {model}"
            );
        }
    }

    #[test]
    fn shared_lines_between_710aix_and_710iva() {
        let aix = BoardModel::Mic710Aix.pin_map();
        let iva = BoardModel::Mic710Iva.pin_map();
        assert_eq!(aix.inputs, iva.inputs);
        assert_eq!(aix.outputs, iva.outputs);
    }

    #[test]
    fn model_token_round_trips_through_name() {
        for model in BoardModel::ALL {
            assert_eq!(BoardModel::from_token(model.name()), Some(model));
        }
    }

    #[test]
    fn parse_splits_model_and_bsp_independently() {
        let descriptor = BoardDescriptor::parse("MIC-730AI_buildinfo,extra").unwrap();
        assert_eq!(descriptor.model, BoardModel::Mic730Ai);
        assert_eq!(descriptor.bsp, "MIC-730AI_buildinfo");
    }

    #[test]
    fn parse_without_delimiters_uses_whole_string() {
        let descriptor = BoardDescriptor::parse("MIC-710AI").unwrap();
        assert_eq!(descriptor.model, BoardModel::Mic710Ai);
        assert_eq!(descriptor.bsp, "MIC-710AI");
    }

    #[test]
    fn parse_unknown_model_is_rejected() {
        let err = BoardDescriptor::parse("MIC-999ZZ_buildinfo,extra").unwrap_err();
        match err {
            AppError::UnknownModel(token) => assert_eq!(token, "MIC-999ZZ"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn detect_missing_file_is_config_error() {
        let err = BoardDescriptor::detect("/nonexistent/version").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
