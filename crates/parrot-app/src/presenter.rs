use std::collections::HashMap;

use kanal::AsyncSender;
use parrot_types::{Answer, ClientMessage, PresentRequest, TaskId};
use tokio::sync::oneshot;

/// How a presentation ended on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Answered(Answer),
    /// Popup closed without an answer
    Closed,
}

/// Shows quizzes in the page popup and routes answers back by task id
pub struct PagePresenter {
    page_tx: AsyncSender<ClientMessage>,
    pending: HashMap<TaskId, oneshot::Sender<Presentation>>,
}

impl PagePresenter {
    pub fn new(page_tx: AsyncSender<ClientMessage>) -> Self {
        Self {
            page_tx,
            pending: HashMap::new(),
        }
    }

    /// Ask the page to open the popup. The receiver resolves once the page
    /// reports back for this task id.
    pub async fn present(
        &mut self,
        request: PresentRequest,
    ) -> anyhow::Result<oneshot::Receiver<Presentation>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request.task_id, tx);

        self.page_tx
            .send(ClientMessage::InitQuiz {
                task_id: request.task_id,
                word: request.word,
                mode: request.content.mode(),
                content: request.content,
            })
            .await?;
        Ok(rx)
    }

    /// Returns false when no presentation is waiting for `task_id`
    pub fn resolve(&mut self, task_id: TaskId, answer: Answer) -> bool {
        self.finish(task_id, Presentation::Answered(answer))
    }

    pub fn close(&mut self, task_id: TaskId) -> bool {
        self.finish(task_id, Presentation::Closed)
    }

    /// Drop a presentation without notifying its waiter
    pub fn forget(&mut self, task_id: TaskId) {
        self.pending.remove(&task_id);
    }

    fn finish(&mut self, task_id: TaskId, presentation: Presentation) -> bool {
        match self.pending.remove(&task_id) {
            Some(tx) => tx.send(presentation).is_ok(),
            None => false,
        }
    }
}
