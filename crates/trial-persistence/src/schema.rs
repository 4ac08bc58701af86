//! Esquema Diesel (mantenido a mano junto a `migrations/`).

diesel::table! {
    trials (id) {
        id -> Uuid,
        trial_no -> Text,
        part_name -> Text,
        status -> Text,
        halted_step_code -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    step_data (id) {
        id -> Uuid,
        trial_id -> Uuid,
        step_code -> Text,
        data_json -> Jsonb,
        validation_status -> Text,
        remarks -> Nullable<Text>,
        completed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_steps (code) {
        code -> Text,
        name -> Text,
        order_index -> Int4,
    }
}

diesel::joinable!(step_data -> trials (trial_id));

diesel::allow_tables_to_appear_in_same_query!(trials, step_data, workflow_steps);
