diesel::table! {
    datasets (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    data_elements (id) {
        id -> Integer,
        name -> Text,
        data_type -> Text,
        is_required -> Bool,
        is_pii -> Bool,
        dataset_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::joinable!(data_elements -> datasets (dataset_id));

diesel::allow_tables_to_appear_in_same_query!(datasets, data_elements,);
