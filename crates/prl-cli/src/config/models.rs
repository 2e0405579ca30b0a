use prlstructure::engine::config as core_config;
use std::path::PathBuf;

pub struct EndmemberAppConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::EndmemberConfig,
}

pub struct DiluteAppConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::DiluteConfig,
}

pub struct SqsAppConfig {
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    pub core_config: core_config::SqsConfig,
}
