//! Fixed names shared by the pipeline stages

pub const DATABASE_NAME: &str = "telecom_churn";
pub const COLLECTION_NAME: &str = "churn_data";
pub const MONGODB_URL_KEY: &str = "MONGODB_URL";

pub const PIPELINE_NAME: &str = "predict_telecom_churn";
pub const ARTIFACT_DIR: &str = "artifact";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub const TARGET_COLUMN: &str = "Churn";
pub const COERCED_NUMERIC_COLUMN: &str = "TotalCharges";
pub const POSITIVE_LABEL: f64 = 1.0;

pub const SCHEMA_FILE_PATH: &str = "config/schema.yaml";
pub const MODEL_CONFIG_FILE_PATH: &str = "config/model.yaml";

pub const FILE_NAME: &str = "Telco_Customer_Churn.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const TRAIN_ARRAY_FILE_NAME: &str = "train.bin";
pub const TEST_ARRAY_FILE_NAME: &str = "test.bin";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.bin";
pub const MODEL_FILE_NAME: &str = "model.bin";

pub const DATA_INGESTION_DIR_NAME: &str = "data_ingestion";
pub const DATA_INGESTION_FEATURE_STORE_DIR: &str = "feature_store";
pub const DATA_INGESTION_INGESTED_DIR: &str = "ingested";
pub const DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO: f64 = 0.2;

pub const DATA_VALIDATION_DIR_NAME: &str = "data_validation";
pub const DATA_VALIDATION_DRIFT_REPORT_DIR: &str = "drift_report";
pub const DATA_VALIDATION_DRIFT_REPORT_FILE_NAME: &str = "report.yaml";
pub const DRIFT_SIGNIFICANCE_LEVEL: f64 = 0.05;

pub const DATA_TRANSFORMATION_DIR_NAME: &str = "data_transformation";
pub const DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR: &str = "transformed";
pub const DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR: &str = "transformed_object";

pub const MODEL_TRAINER_DIR_NAME: &str = "model_trainer";
pub const MODEL_TRAINER_TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_TRAINER_EXPECTED_SCORE: f64 = 0.6;
pub const MODEL_TRAINER_CV_FOLDS: usize = 5;
pub const MODEL_TRAINER_TOP_K: usize = 4;

pub const MODEL_EVALUATION_CHANGED_THRESHOLD_SCORE: f64 = 0.02;
pub const MODEL_BUCKET_NAME: &str = "telcochurn-model2025";
pub const MODEL_PUSHER_S3_KEY: &str = "model.bin";
pub const AWS_REGION: &str = "ap-south-1";
pub const AWS_ACCESS_KEY_ID_ENV_KEY: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV_KEY: &str = "AWS_SECRET_ACCESS_KEY";

pub const RANDOM_STATE: u64 = 42;

pub const APP_HOST: &str = "0.0.0.0";
pub const APP_PORT: u16 = 8080;
