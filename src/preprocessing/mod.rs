//! Feature preprocessing
//!
//! Scaling, one-hot and label encoding, and the column transformer that
//! combines them into the fitted preprocessing object persisted with each run.

mod column_transformer;
mod encoder;
mod scaler;

pub use column_transformer::ColumnTransformer;
pub use encoder::{LabelEncoder, OneHotEncoder};
pub use scaler::StandardScaler;

use serde::{Deserialize, Serialize};

/// Everything the transformation stage fits, persisted as
/// `transformed_object/preprocessing.bin` and later folded into the model bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingObject {
    pub transformer: ColumnTransformer,
    pub label_encoder: LabelEncoder,
}
