//! Catalog Mapper Common Library
//!
//! 商品名・説明からマーケットプレイスのカテゴリ（メイン／サブ）を判定する照合エンジン。
//! I/O・ネットワークを持たない純粋な処理のみを置き、CLI側から共有される。

pub mod confidence;
pub mod corrections;
pub mod direct;
pub mod error;
pub mod gender;
pub mod matcher;
pub mod normalizer;
pub mod parser;
pub mod prompts;
pub mod scoring;
pub mod taxonomy;
pub mod terms;
pub mod types;

pub use confidence::{apply_overrides, builtin_overrides, confidence_from_score, ConfidenceOverride};
pub use corrections::{Correction, CorrectionMap};
pub use direct::{find_term_match, MatchKind, TermMatch};
pub use error::{Error, Result};
pub use gender::{detect_gender, disambiguate, Gender};
pub use matcher::{match_category, CategoryMatcher, MatcherConfig};
pub use normalizer::{normalize_text, significant_terms, PreparedText};
pub use parser::{
    extract_json_object, interpret_remote_reply, parse_remote_response, validate_remote_answer, RemoteAnswer,
    RemoteVerdict, UNCATEGORIZED,
};
pub use prompts::build_classification_prompt;
pub use scoring::{score_category, score_taxonomy, CategoryScore, SubcategoryScore};
pub use taxonomy::{Category, Subcategory, Taxonomy};
pub use terms::{TermEntry, TermTable};
pub use types::{MatchResult, ProductText};
