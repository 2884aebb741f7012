use std::sync::Arc;

use muni::{derive::Message, Bus, Context, HandlerTable, Result as MuniResult, Subscriber};
use parking_lot::Mutex;

#[derive(Debug, Clone, Message)]
#[namespace("demo")]
struct Reading {
    celsius: f32,
}

#[derive(Debug, Message)]
#[namespace("demo")]
struct Notice {
    text: String,
}

#[derive(Debug, Message)]
#[namespace("demo")]
struct Alarm {
    #[message(base)]
    notice: Notice,
    celsius: f32,
}

#[derive(Debug, Message)]
struct Shutdown;

struct Sensor {
    last: Mutex<Option<Reading>>,
}

impl Sensor {
    fn current(&self) -> Option<Reading> {
        self.last.lock().clone()
    }
}

impl Subscriber for Sensor {
    fn describe(table: &mut HandlerTable<Self>) {
        table.produce("current", Self::current);
    }
}

struct Monitor {
    limit: f32,
}

impl Monitor {
    fn on_reading(&self, msg: &Reading, ctx: &Context) -> MuniResult<()> {
        println!("---> reading {}", msg.celsius);

        if msg.celsius > self.limit {
            ctx.post(Alarm {
                notice: Notice {
                    text: format!("above {}", self.limit),
                },
                celsius: msg.celsius,
            })?;
        }

        Ok(())
    }

    fn on_alarm(&self, msg: &Alarm, _ctx: &Context) {
        println!("---> alarm {}", msg.celsius);
    }
}

struct Journal;

impl Subscriber for Journal {
    fn describe(table: &mut HandlerTable<Self>) {
        table.subscribe("on_notice", |_: &Self, msg: &Notice, _: &Context| {
            println!("---> notice: {}", msg.text)
        });
    }
}

impl Subscriber for Monitor {
    fn describe(table: &mut HandlerTable<Self>) {
        table
            .subscribe("on_reading", Self::on_reading)
            .subscribe("on_alarm", Self::on_alarm);
    }
}

fn main() -> MuniResult<()> {
    env_logger::init();

    let bus = Bus::build().identifier("demo").build()?;
    bus.on_dead_message(|dead| println!("---> nobody listens to {:?}", dead.message()));

    let sensor = Arc::new(Sensor {
        last: Mutex::new(Some(Reading { celsius: 21.5 })),
    });
    bus.register(&sensor)?;

    // receives the sensor's current reading right away
    let monitor = Arc::new(Monitor { limit: 30.0 });
    bus.register(&monitor)?;

    let journal = Arc::new(Journal);
    bus.register(&journal)?;

    // the alarm is delivered after on_reading returns, to on_alarm and on_notice
    bus.post(Reading { celsius: 34.0 })?;
    bus.post(Shutdown)?;

    bus.unregister(&journal)?;
    bus.unregister(&monitor)?;
    bus.unregister(&sensor)?;
    assert!(bus.is_empty());

    Ok(())
}
