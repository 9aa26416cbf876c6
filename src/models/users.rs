crate::record! {
    /// A user profile, looked up by nickname.
    #[record(table = "users", route = "users", input = UserInput, update = UserUpdate)]
    pub struct User {
        pub nickname: String [index],
        pub name: String,
        pub lastname: String,
    }
}
