pub mod html;

pub use html::render_widget_html;
