pub mod wopi;
