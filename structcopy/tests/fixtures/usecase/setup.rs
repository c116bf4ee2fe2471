use crate::{domain, model};

/// Pet store converters.
trait StructCopyGen {
    /// Copies a domain pet into the storage model.
    /// :typecast
    /// :stringer
    /// :getter
    /// :map category.id category_id
    /// :match_method label label()
    /// :literal kind "dog".to_owned()
    fn domain_to_model(pet: &domain::Pet) -> model::Pet;

    /// :struct_conv domain_to_model
    fn pets_to_model(pets: &[domain::Pet]) -> Vec<model::Pet>;

    /// :style arg
    /// :reverse
    /// :recv category
    /// :typecast
    /// :map id category_id
    /// :postprocess after_category
    fn category_to_model(category: &domain::Category, out: &mut model::Category);

    /// :match none
    /// :conv status status_text
    /// :colour blue
    fn status_only(pet: &domain::Pet) -> model::Pet;
}

fn status_text(status: &domain::PetStatus) -> String {
    status.to_string()
}

fn after_category(dst: &mut model::Category, src: &domain::Category) {
    dst.name = src.name.to_uppercase();
}
