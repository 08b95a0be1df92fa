//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、属性与 class、文本节点、插入与移除）
//! - `selector`: 忽略/强制规则使用的选择器子集
//! - `serializer`: 序列化功能

pub mod dom;
pub mod selector;
pub mod serializer;

pub use dom::{get_node_attr, get_node_name, get_parent_node, html_to_dom, set_node_attr};
pub use selector::{SelectorError, SelectorList};
pub use serializer::serialize_document;
