use std::fmt;

pub struct Category {
    pub id: u64,
    pub name: String,
}

pub enum PetStatus {
    Available,
    Sold,
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Sold => write!(f, "sold"),
        }
    }
}

pub struct Pet {
    pub id: u64,
    pub category: Category,
    pub name: String,
    pub photo_urls: Vec<String>,
    pub status: PetStatus,
}

impl Pet {
    pub fn age(&self) -> u32 {
        3
    }

    pub fn label(&self) -> Result<String, String> {
        Ok(format!("{} ({})", self.name, self.category.name))
    }
}
