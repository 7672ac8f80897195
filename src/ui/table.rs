use tabled::{settings::Style, Table, Tabled};

use crate::relationship::RelationshipDefinition;
use crate::storage::ContentItem;

#[derive(Tabled)]
pub struct RelationshipRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "From")]
    pub from: String,
    #[tabled(rename = "To")]
    pub to: String,
    #[tabled(rename = "Direction")]
    pub direction: String,
    #[tabled(rename = "UI")]
    pub enable_ui: String,
    #[tabled(rename = "Id")]
    pub id: String,
}

impl From<&RelationshipDefinition> for RelationshipRow {
    fn from(def: &RelationshipDefinition) -> Self {
        Self {
            key: def.key(),
            from: def.from().to_string(),
            to: def.to().to_string(),
            direction: if def.is_bidirectional() { "both" } else { "one-way" }.to_string(),
            enable_ui: if def.enable_ui { "yes" } else { "no" }.to_string(),
            id: def.id.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Type")]
    pub post_type: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn relationships_table<'a>(definitions: impl IntoIterator<Item = &'a RelationshipDefinition>) -> String {
    let rows: Vec<RelationshipRow> = definitions.into_iter().map(RelationshipRow::from).collect();
    render(&rows)
}

pub fn items_table(items: &[ContentItem]) -> String {
    let rows: Vec<ItemRow> = items
        .iter()
        .map(|item| ItemRow {
            id: item.id,
            post_type: item.post_type.clone(),
            title: item.title.clone(),
            status: item.status.clone(),
        })
        .collect();
    render(&rows)
}
