pub mod cfg_text;
