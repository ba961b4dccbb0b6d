use schema_to_swagger::{Field, FieldKind, Nested, Schema, SwaggerDocument};
use serde_json::json;

fn main() {
    let category = Schema::new("Category")
        .field(Field::new("id", FieldKind::Integer))
        .field(Field::new("name", FieldKind::String).required())
        .into_shared();

    let pet = Schema::new("Pet")
        .field(Field::new("id", FieldKind::Integer))
        .field(Field::new("name", FieldKind::String).required())
        .field(Field::nested("category", Nested::Name("Category".to_string())))
        .field(
            Field::new("tags", FieldKind::List(Box::new(FieldKind::String)))
                .default_producer(|| json!([])),
        )
        .into_shared();

    let mut spec = SwaggerDocument::new("Swagger Petstore", "1.0.0")
        .description("A sample Petstore document built from declarative schemas.")
        .naming_policy(Box::new(|schema| Some(schema.name.clone())));
    spec.register_schema(category);
    spec.definition("Pet", &pet);

    let doc = "Pet collection handler.

    ---
    get:
        responses:
            200:
                schema:
                    type: array
                    items: models.Pet
                description: list all pets
    post:
        parameters:
            - in: body
              schema: models.Pet
        responses:
            201:
                description: pet created
    ";
    spec.register_schema(pet);
    spec.add_path("/pet", None, Some(doc)).unwrap();

    println!("{}", spec.to_json().unwrap());
}
