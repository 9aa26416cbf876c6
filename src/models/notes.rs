crate::record! {
    /// A titled text note.
    #[record(table = "notes", route = "notes", input = NoteInput, update = NoteUpdate)]
    pub struct Note {
        pub title: String [index],
        pub content: String,
    }
}
