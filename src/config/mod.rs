//! OCR Configuration
//!
//! Pipeline settings stored in TOML (or JSON) format, and the validated
//! per-stage configs that the detector and recognizer are built from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::vision::frame::ChannelOrder;

/// ImageNet channel means in RGB order
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations in RGB order
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// OCR settings as read from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Worker pool settings
    #[serde(default)]
    pub pool: PoolSettings,
    /// Text detection model settings
    pub detection: DetectionSettings,
    /// Text recognition model settings
    pub recognition: RecognitionSettings,
    /// Character dictionary settings
    pub dictionary: DictionarySettings,
    /// Thresholds shared by both stages
    #[serde(default)]
    pub postprocess: PostprocessSettings,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            pool: PoolSettings::default(),
            detection: DetectionSettings::default(),
            recognition: RecognitionSettings::default(),
            dictionary: DictionarySettings::default(),
            postprocess: PostprocessSettings::default(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Number of independent pipelines (each owns its own model sessions)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Detection model settings
///
/// `mean` and `std` are given in RGB order; `channel_order` is the order the
/// model expects its input planes in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    pub model_path: PathBuf,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    /// NCHW template, `-1` marks a dynamic dimension
    pub input_shape: Vec<i64>,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/det.onnx"),
            mean: IMAGENET_MEAN.to_vec(),
            std: IMAGENET_STD.to_vec(),
            channel_order: ChannelOrder::Rgb,
            min_size: default_min_size(),
            max_size: default_max_size(),
            input_names: vec!["x".to_string()],
            output_names: vec!["fetch_name_0".to_string()],
            input_shape: vec![-1, 3, -1, -1],
            intra_threads: default_intra_threads(),
        }
    }
}

/// Recognition model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionSettings {
    pub model_path: PathBuf,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    #[serde(default = "default_rec_channel_order")]
    pub channel_order: ChannelOrder,
    /// Fixed input height
    #[serde(default = "default_rec_image_height")]
    pub image_height: u32,
    /// Width cap before padding to a multiple of 32
    #[serde(default = "default_rec_max_width")]
    pub max_width: u32,
    /// Accepted for compatibility; crops are recognized one at a time
    #[serde(default = "default_rec_batch_num")]
    pub batch_num: usize,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub input_shape: Vec<i64>,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/rec.onnx"),
            mean: vec![0.5, 0.5, 0.5],
            std: vec![0.5, 0.5, 0.5],
            channel_order: default_rec_channel_order(),
            image_height: default_rec_image_height(),
            max_width: default_rec_max_width(),
            batch_num: default_rec_batch_num(),
            input_names: vec!["x".to_string()],
            output_names: vec!["fetch_name_0".to_string()],
            input_shape: vec![-1, 3, default_rec_image_height() as i64, -1],
            intra_threads: default_intra_threads(),
        }
    }
}

/// Character dictionary settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionarySettings {
    pub path: PathBuf,
    /// Expected glyph count; a mismatch is only logged. `0` disables the check.
    #[serde(default = "default_dict_size")]
    pub expected_size: usize,
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/ppocrv5_dict.txt"),
            expected_size: default_dict_size(),
        }
    }
}

/// How a detection box is scored before suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxScoreMode {
    /// Mean probability inside the rotated rectangle
    #[default]
    MeanProbability,
    /// Fixed placeholder score (`constant_score`)
    Constant,
}

/// Post-processing thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostprocessSettings {
    /// Probability-map binarization threshold, also the NMS score cutoff
    #[serde(default = "default_det_db_thresh")]
    pub det_db_thresh: f32,
    /// Rotated NMS overlap threshold
    #[serde(default = "default_det_db_box_thresh")]
    pub det_db_box_thresh: f32,
    /// Minimum mean CTC confidence
    #[serde(default = "default_rec_score_thresh")]
    pub rec_score_thresh: f32,
    /// Maximum decoded length in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default)]
    pub box_score: BoxScoreMode,
    #[serde(default = "default_constant_score")]
    pub constant_score: f32,
}

impl Default for PostprocessSettings {
    fn default() -> Self {
        Self {
            det_db_thresh: default_det_db_thresh(),
            det_db_box_thresh: default_det_db_box_thresh(),
            rec_score_thresh: default_rec_score_thresh(),
            max_text_length: default_max_text_length(),
            box_score: BoxScoreMode::default(),
            constant_score: default_constant_score(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_min_size() -> u32 {
    32
}

fn default_max_size() -> u32 {
    1536
}

fn default_intra_threads() -> usize {
    4
}

fn default_rec_channel_order() -> ChannelOrder {
    ChannelOrder::Bgr
}

fn default_rec_image_height() -> u32 {
    48
}

fn default_rec_max_width() -> u32 {
    320
}

fn default_rec_batch_num() -> usize {
    6
}

fn default_dict_size() -> usize {
    6625
}

fn default_det_db_thresh() -> f32 {
    0.3
}

fn default_det_db_box_thresh() -> f32 {
    0.6
}

fn default_rec_score_thresh() -> f32 {
    0.5
}

fn default_max_text_length() -> usize {
    25
}

fn default_constant_score() -> f32 {
    0.9
}

/// Per-channel normalization, RGB order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    fn from_settings(stage: &'static str, mean: &[f32], std: &[f32]) -> Result<Self, ConfigError> {
        let mean: [f32; 3] = mean.try_into().map_err(|_| ConfigError::ChannelStats {
            stage,
            field: "mean",
            len: mean.len(),
        })?;
        let std: [f32; 3] = std.try_into().map_err(|_| ConfigError::ChannelStats {
            stage,
            field: "std",
            len: std.len(),
        })?;

        for (index, &value) in std.iter().enumerate() {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositiveStd { stage, index, value });
            }
        }

        Ok(Self { mean, std })
    }
}

/// Validated NCHW input shape template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeTemplate {
    dims: [i64; 4],
}

impl ShapeTemplate {
    /// Marker for a dimension resolved per call
    pub const DYNAMIC: i64 = -1;

    fn parse(stage: &'static str, template: &[i64]) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::ShapeTemplate {
            stage,
            template: template.to_vec(),
            reason: reason.to_string(),
        };

        let dims: [i64; 4] = template
            .try_into()
            .map_err(|_| invalid("expected 4 dimensions (N, C, H, W)"))?;

        if dims.iter().any(|&d| d != Self::DYNAMIC && d <= 0) {
            return Err(invalid("dimensions must be positive or -1"));
        }
        if dims[0] != Self::DYNAMIC && dims[0] != 1 {
            return Err(invalid("batch dimension must be 1 or -1"));
        }
        if dims[1] != Self::DYNAMIC && dims[1] != 3 {
            return Err(invalid("channel dimension must be 3 or -1"));
        }

        Ok(Self { dims })
    }

    /// Raw template dimensions
    pub fn dims(&self) -> [i64; 4] {
        self.dims
    }

    /// Check a concrete tensor shape against the template
    pub fn accepts(&self, shape: &[usize]) -> bool {
        shape.len() == 4
            && self
                .dims
                .iter()
                .zip(shape)
                .all(|(&d, &s)| d == Self::DYNAMIC || d as usize == s)
    }
}

/// Box scoring used by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxScore {
    MeanProbability,
    Constant(f32),
}

/// Immutable detector configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    pub normalization: Normalization,
    pub channel_order: ChannelOrder,
    pub min_size: u32,
    pub max_size: u32,
    pub det_threshold: f32,
    pub nms_threshold: f32,
    pub box_score: BoxScore,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub input_shape: ShapeTemplate,
    pub intra_threads: usize,
}

/// Immutable recognizer configuration
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub model_path: PathBuf,
    pub normalization: Normalization,
    pub channel_order: ChannelOrder,
    pub image_height: u32,
    pub max_width: u32,
    pub batch_num: usize,
    pub rec_threshold: f32,
    pub max_text_length: usize,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
    pub input_shape: ShapeTemplate,
    pub intra_threads: usize,
}

impl OcrConfig {
    /// Validate detection settings
    pub fn detector_config(&self) -> Result<DetectorConfig, ConfigError> {
        const STAGE: &str = "detection";
        let det = &self.detection;
        let post = &self.postprocess;

        check_model_path(STAGE, &det.model_path)?;
        let normalization = Normalization::from_settings(STAGE, &det.mean, &det.std)?;

        if det.min_size == 0 {
            return Err(invalid(STAGE, "min_size", "must be at least 1"));
        }
        if det.max_size < det.min_size {
            return Err(invalid(STAGE, "max_size", "must not be smaller than min_size"));
        }
        check_names(STAGE, &det.input_names)?;
        check_threads(STAGE, det.intra_threads)?;

        let input_shape = ShapeTemplate::parse(STAGE, &det.input_shape)?;
        let [_, _, h, w] = input_shape.dims();
        if [h, w]
            .iter()
            .any(|&d| d != ShapeTemplate::DYNAMIC && d != det.max_size as i64)
        {
            return Err(ConfigError::ShapeTemplate {
                stage: STAGE,
                template: det.input_shape.clone(),
                reason: format!("fixed height/width must equal max_size ({})", det.max_size),
            });
        }

        check_threshold("postprocess.det_db_thresh", post.det_db_thresh)?;
        check_threshold("postprocess.det_db_box_thresh", post.det_db_box_thresh)?;
        let box_score = match post.box_score {
            BoxScoreMode::MeanProbability => BoxScore::MeanProbability,
            BoxScoreMode::Constant => {
                check_threshold("postprocess.constant_score", post.constant_score)?;
                BoxScore::Constant(post.constant_score)
            }
        };

        Ok(DetectorConfig {
            model_path: det.model_path.clone(),
            normalization,
            channel_order: det.channel_order,
            min_size: det.min_size,
            max_size: det.max_size,
            det_threshold: post.det_db_thresh,
            nms_threshold: post.det_db_box_thresh,
            box_score,
            input_names: det.input_names.clone(),
            output_names: det.output_names.clone(),
            input_shape,
            intra_threads: det.intra_threads,
        })
    }

    /// Validate recognition settings
    pub fn recognizer_config(&self) -> Result<RecognizerConfig, ConfigError> {
        const STAGE: &str = "recognition";
        let rec = &self.recognition;
        let post = &self.postprocess;

        check_model_path(STAGE, &rec.model_path)?;
        let normalization = Normalization::from_settings(STAGE, &rec.mean, &rec.std)?;

        if rec.image_height == 0 {
            return Err(invalid(STAGE, "image_height", "must be at least 1"));
        }
        if rec.max_width == 0 {
            return Err(invalid(STAGE, "max_width", "must be at least 1"));
        }
        if rec.batch_num == 0 {
            return Err(invalid(STAGE, "batch_num", "must be at least 1"));
        }
        check_names(STAGE, &rec.input_names)?;
        check_threads(STAGE, rec.intra_threads)?;

        let input_shape = ShapeTemplate::parse(STAGE, &rec.input_shape)?;
        let [_, _, h, w] = input_shape.dims();
        if h != ShapeTemplate::DYNAMIC && h != rec.image_height as i64 {
            return Err(ConfigError::ShapeTemplate {
                stage: STAGE,
                template: rec.input_shape.clone(),
                reason: format!("fixed height must equal image_height ({})", rec.image_height),
            });
        }
        if w != ShapeTemplate::DYNAMIC {
            return Err(ConfigError::ShapeTemplate {
                stage: STAGE,
                template: rec.input_shape.clone(),
                reason: "width must be dynamic (-1)".to_string(),
            });
        }

        check_threshold("postprocess.rec_score_thresh", post.rec_score_thresh)?;
        if post.max_text_length == 0 {
            return Err(invalid("postprocess", "max_text_length", "must be at least 1"));
        }

        Ok(RecognizerConfig {
            model_path: rec.model_path.clone(),
            normalization,
            channel_order: rec.channel_order,
            image_height: rec.image_height,
            max_width: rec.max_width,
            batch_num: rec.batch_num,
            rec_threshold: post.rec_score_thresh,
            max_text_length: post.max_text_length,
            input_names: rec.input_names.clone(),
            output_names: rec.output_names.clone(),
            input_shape,
            intra_threads: rec.intra_threads,
        })
    }

    /// Validate every section at once
    pub fn validate(&self) -> Result<(DetectorConfig, RecognizerConfig), ConfigError> {
        if self.pool.workers == 0 {
            return Err(invalid("pool", "workers", "must be at least 1"));
        }
        if self.dictionary.path.as_os_str().is_empty() {
            return Err(invalid("dictionary", "path", "must not be empty"));
        }
        Ok((self.detector_config()?, self.recognizer_config()?))
    }
}

fn invalid(stage: &'static str, field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        stage,
        field,
        reason: reason.to_string(),
    }
}

fn check_model_path(stage: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(invalid(stage, "model_path", "must not be empty"));
    }
    Ok(())
}

fn check_names(stage: &'static str, names: &[String]) -> Result<(), ConfigError> {
    if names.is_empty() || names.iter().any(|n| n.is_empty()) {
        return Err(invalid(stage, "input_names", "must name at least one input"));
    }
    Ok(())
}

fn check_threads(stage: &'static str, threads: usize) -> Result<(), ConfigError> {
    if threads == 0 {
        return Err(invalid(stage, "intra_threads", "must be at least 1"));
    }
    Ok(())
}

fn check_threshold(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { field, value });
    }
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Load configuration from file (JSON when the extension is `.json`, TOML otherwise)
pub fn load_config(path: &Path) -> Result<OcrConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if is_json(path) {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Save configuration to file
pub fn save_config(config: &OcrConfig, path: &Path) -> Result<(), ConfigError> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
    } else {
        toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
    };
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[detection]
model_path = "det.onnx"
mean = [0.485, 0.456, 0.406]
std = [0.229, 0.224, 0.225]
input_names = ["x"]
output_names = ["sigmoid_0.tmp_0"]
input_shape = [-1, 3, -1, -1]

[recognition]
model_path = "rec.onnx"
mean = [0.5, 0.5, 0.5]
std = [0.5, 0.5, 0.5]
input_names = ["x"]
output_names = ["softmax_0.tmp_0"]
input_shape = [-1, 3, 48, -1]

[dictionary]
path = "dict.txt"
"#;

    #[test]
    fn test_default_ocr_config() {
        let config = OcrConfig::default();

        assert_eq!(config.detection.min_size, 32);
        assert_eq!(config.detection.max_size, 1536);
        assert_eq!(config.detection.channel_order, ChannelOrder::Rgb);
        assert_eq!(config.recognition.image_height, 48);
        assert_eq!(config.recognition.max_width, 320);
        assert_eq!(config.recognition.batch_num, 6);
        assert_eq!(config.recognition.channel_order, ChannelOrder::Bgr);
        assert_eq!(config.dictionary.expected_size, 6625);
        assert!((config.postprocess.det_db_thresh - 0.3).abs() < 1e-6);
        assert!((config.postprocess.det_db_box_thresh - 0.6).abs() < 1e-6);
        assert!((config.postprocess.rec_score_thresh - 0.5).abs() < 1e-6);
        assert_eq!(config.postprocess.max_text_length, 25);
        assert_eq!(config.postprocess.box_score, BoxScoreMode::MeanProbability);
        assert_eq!(config.pool.workers, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_config_validates() {
        let (det, rec) = OcrConfig::default().validate().unwrap();

        assert_eq!(det.normalization.mean, IMAGENET_MEAN);
        assert_eq!(det.box_score, BoxScore::MeanProbability);
        assert!((det.nms_threshold - 0.6).abs() < 1e-6);
        assert_eq!(rec.input_shape.dims(), [-1, 3, 48, -1]);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = OcrConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: OcrConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.detection.mean, config.detection.mean);
        assert_eq!(parsed.recognition.input_shape, config.recognition.input_shape);
        assert_eq!(parsed.postprocess.box_score, config.postprocess.box_score);
    }

    #[test]
    fn test_load_minimal_toml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.detection.model_path, PathBuf::from("det.onnx"));
        assert_eq!(config.detection.max_size, 1536);
        assert_eq!(config.recognition.channel_order, ChannelOrder::Bgr);
        assert_eq!(config.postprocess.max_text_length, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let broken = MINIMAL_TOML.replace("mean = [0.485, 0.456, 0.406]\n", "");
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(broken.as_bytes()).unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_save_and_load_json() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let mut config = OcrConfig::default();
        config.postprocess.box_score = BoxScoreMode::Constant;
        config.pool.workers = 3;

        save_config(&config, file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.trim_start().starts_with('{'));

        let loaded = load_config(file.path()).unwrap();
        assert_eq!(loaded.pool.workers, 3);
        assert_eq!(loaded.postprocess.box_score, BoxScoreMode::Constant);
    }

    #[test]
    fn test_unreadable_config() {
        let err = load_config(Path::new("/nonexistent/ocr.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_mean_must_have_three_entries() {
        let mut config = OcrConfig::default();
        config.detection.mean = vec![0.5, 0.5];

        let err = config.detector_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ChannelStats { field: "mean", len: 2, .. }
        ));
    }

    #[test]
    fn test_std_must_be_positive() {
        let mut config = OcrConfig::default();
        config.recognition.std = vec![0.5, 0.0, 0.5];

        let err = config.recognizer_config().unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveStd { index: 1, .. }));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = OcrConfig::default();
        config.postprocess.det_db_thresh = 1.5;
        assert!(matches!(
            config.detector_config().unwrap_err(),
            ConfigError::ThresholdOutOfRange { .. }
        ));

        let mut config = OcrConfig::default();
        config.postprocess.rec_score_thresh = f32::NAN;
        assert!(matches!(
            config.recognizer_config().unwrap_err(),
            ConfigError::ThresholdOutOfRange { .. }
        ));
    }

    #[test]
    fn test_shape_template_validation() {
        let mut config = OcrConfig::default();
        config.detection.input_shape = vec![1, 3, -1];
        assert!(matches!(
            config.detector_config().unwrap_err(),
            ConfigError::ShapeTemplate { .. }
        ));

        let mut config = OcrConfig::default();
        config.detection.input_shape = vec![1, 1, -1, -1];
        assert!(config.detector_config().is_err());

        let mut config = OcrConfig::default();
        config.detection.input_shape = vec![1, 3, 1536, 1536];
        assert!(config.detector_config().is_ok());

        let mut config = OcrConfig::default();
        config.recognition.input_shape = vec![-1, 3, 32, -1];
        assert!(config.recognizer_config().is_err());

        let mut config = OcrConfig::default();
        config.recognition.input_shape = vec![-1, 3, 48, 320];
        assert!(config.recognizer_config().is_err());
    }

    #[test]
    fn test_shape_template_accepts() {
        let template = ShapeTemplate::parse("detection", &[-1, 3, -1, -1]).unwrap();
        assert!(template.accepts(&[1, 3, 960, 960]));
        assert!(!template.accepts(&[1, 1, 960, 960]));
        assert!(!template.accepts(&[3, 960, 960]));
    }

    #[test]
    fn test_missing_input_names_rejected() {
        let mut config = OcrConfig::default();
        config.detection.input_names.clear();
        assert!(matches!(
            config.detector_config().unwrap_err(),
            ConfigError::InvalidField { field: "input_names", .. }
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = OcrConfig::default();
        config.pool.workers = 0;
        assert!(config.validate().is_err());
    }
}
