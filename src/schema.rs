// Kept in sync with `repository::init_schema`.

diesel::table! {
    entity_views (entity_id) {
        entity_id -> BigInt,
        views -> BigInt,
        updated_at -> Text,
    }
}
