diesel::table! {
    datasets (id) {
        id -> Text,
        name -> Text,
        description -> Text,
        source_application -> Text,
        organization_id -> Text,
        created_by -> Text,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
        schema_fields -> Jsonb,
        schema_version -> Text,
        primary_key -> Nullable<Text>,
        record_count -> Int8,
        tags -> Array<Text>,
        category -> Text,
        is_public -> Bool,
        last_record_at -> Nullable<Timestamptz>,
        owners -> Array<Text>,
        editors -> Array<Text>,
        viewers -> Array<Text>,
        public_read -> Bool,
        source_form_id -> Nullable<Text>,
        api_key -> Nullable<Text>,
        webhook_url -> Nullable<Text>,
        auto_sync -> Bool,
        display_settings -> Jsonb,
    }
}
