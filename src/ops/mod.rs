pub mod canonical;
pub mod clean_spacing;
pub mod convert;
pub mod export_docx;
pub mod fix_docx_ids;
pub mod flag_audit;
pub mod flag_sync;
pub mod images;
pub mod lead;
pub mod propagate;
pub mod publish;
pub mod renumber;
