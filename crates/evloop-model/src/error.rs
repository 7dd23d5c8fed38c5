use thiserror::Error;

use evloop_expr::ExprError;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("construction error: {0}")]
    Construction(String),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("analysis file: {0}")]
    Dsl(String),

    #[error("config error: {0}")]
    Config(#[from] evloop_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
