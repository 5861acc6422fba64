//! Aperio SVS metadata.
//!
//! SVS files store scanner metadata in the first ImageDescription as a
//! pipe-separated string:
//!
//! ```text
//! Aperio Image Library v12.0.15
//! 46000x32914 [0,100 46000x32814] (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.4990
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Parsed SVS ImageDescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SvsMetadata {
    /// Microns per pixel at level 0
    pub mpp: Option<f64>,

    /// Objective magnification
    pub magnification: Option<f64>,

    pub vendor: Option<String>,

    /// Every `key = value` pair in the description
    pub properties: BTreeMap<String, String>,
}

impl SvsMetadata {
    pub fn parse(description: &str) -> Self {
        let mut metadata = SvsMetadata {
            vendor: description
                .contains("Aperio")
                .then(|| "Aperio".to_string()),
            ..Default::default()
        };

        for part in description.split('|') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "MPP" => metadata.mpp = value.parse().ok(),
                "AppMag" => metadata.magnification = value.parse().ok(),
                _ => {}
            }
            metadata
                .properties
                .insert(key.to_string(), value.to_string());
        }

        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aperio_description() {
        let description = "Aperio Image Library v12.0.15\n\
            46000x32914 [0,100 46000x32814] (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.4990|Filename = slide";

        let metadata = SvsMetadata::parse(description);
        assert_eq!(metadata.vendor.as_deref(), Some("Aperio"));
        assert_eq!(metadata.mpp, Some(0.499));
        assert_eq!(metadata.magnification, Some(20.0));
        assert_eq!(metadata.properties.get("Filename").map(String::as_str), Some("slide"));
    }

    #[test]
    fn test_parse_without_properties() {
        let metadata = SvsMetadata::parse("plain tiff");
        assert_eq!(metadata, SvsMetadata::default());
    }

    #[test]
    fn test_parse_ignores_bad_numbers() {
        let metadata = SvsMetadata::parse("Aperio|MPP = abc|AppMag = 40");
        assert_eq!(metadata.mpp, None);
        assert_eq!(metadata.magnification, Some(40.0));
    }
}
