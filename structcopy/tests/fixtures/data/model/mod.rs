#[derive(Default)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

#[derive(Default)]
pub struct Pet {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub photo_urls: Vec<String>,
    pub status: String,
    pub age: u32,
    pub label: String,
    pub kind: String,
}
