// @generated manually, mirroring the shape Diesel CLI would emit from the
// migrations under `migrations/` (see DESIGN.md for the schema rationale).

diesel::table! {
    recordings (id) {
        id -> Int8,
        #[max_length = 255]
        title -> Varchar,
        #[max_length = 255]
        artist -> Varchar,
        #[max_length = 255]
        album -> Nullable<Varchar>,
        duration_s -> Nullable<Float8>,
        #[max_length = 64]
        content_digest -> Varchar,
        config_epoch -> Int8,
        created_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    fingerprints (recording_id, anchor_time, hash) {
        hash -> Int8,
        anchor_time -> Int4,
        recording_id -> Int8,
    }
}

diesel::joinable!(fingerprints -> recordings (recording_id));

diesel::allow_tables_to_appear_in_same_query!(fingerprints, recordings,);
