use state_machines::state_machine;

state_machine! {
    name: QuestionMachine,
    state: QuestionState,
    initial: Ready,
    states: [Ready, Generated, Screened, Indexed, Failed],
    events {
        generate { transition: { from: Ready, to: Generated } }
        screen { transition: { from: Generated, to: Screened } }
        index { transition: { from: Screened, to: Indexed } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Generated, to: Failed }
            transition: { from: Screened, to: Failed }
            transition: { from: Indexed, to: Failed }
        }
    }
}

pub fn ready() -> QuestionMachine<(), Ready> {
    QuestionMachine::new(())
}
