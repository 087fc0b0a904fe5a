diesel::table! {
    accounts (id) {
        id -> Int8,
        platform -> Text,
        username -> Text,
        label -> Nullable<Text>,
        created_at -> Timestamp,
        last_sync_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    jobs (id) {
        id -> Int8,
        account_id -> Int8,
        file_name -> Nullable<Text>,
        status -> Text,
        total_games -> Nullable<Int4>,
        processed_games -> Int4,
        duplicate_games -> Int4,
        archives_processed -> Nullable<Int4>,
        total_archives -> Nullable<Int4>,
        error_message -> Nullable<Text>,
        created_at -> Timestamp,
        completed_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    games (id) {
        id -> Int8,
        account_id -> Int8,
        played_at -> Timestamp,
        result -> Text,
        color -> Text,
        time_control_raw -> Nullable<Text>,
        time_control_category -> Text,
        eco_code -> Nullable<Text>,
        opening_name -> Nullable<Text>,
        opponent -> Nullable<Text>,
        pgn_hash -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(jobs -> accounts (account_id));
diesel::joinable!(games -> accounts (account_id));

diesel::allow_tables_to_appear_in_same_query!(accounts, jobs, games,);
